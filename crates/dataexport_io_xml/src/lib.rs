//! `dataexport_io_xml` v1:
//! XML renderer over core output trees.
//!
//! - `spec`   : options (encoding, indentation, path)
//! - `util`   : element-name and CDATA helpers
//! - `writer` : tree → document, optional file output
pub mod spec;
pub mod util;
pub mod writer;

pub use spec::SpecXmlOptions;
pub use util::{sanitize_element_name, split_cdata};
pub use writer::{XmlWriter, to_xml};
