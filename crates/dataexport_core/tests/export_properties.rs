use std::cell::RefCell;
use std::rc::Rc;

use chrono::NaiveDate;
use dataexport_core::{
    EnumFormatHint, EnumLeafKind, EnumTypeClass, EnumTypeDesc, ExportError, Exportable,
    SpecCompositeType, SpecDecimal, SpecSchema, SpecTableOptions, SpecTreeOptions, ToExportValue,
    build_table, build_tree, classify_type, impl_export_enum, is_leaf,
};

#[derive(Clone, Copy)]
enum Grade {
    Low,
    High,
}

impl_export_enum!(Grade, "demo::Grade", [Low, High]);

struct Pair {
    x: i32,
    y: String,
    grade: Option<Grade>,
    buddy: RefCell<Option<Rc<Pair>>>,
}

impl Exportable for Pair {
    const TYPE_NAME: &'static str = "Pair";
    const TYPE_FULL_NAME: &'static str = "demo::Pair";

    fn schema() -> SpecSchema {
        SpecSchema::builder::<Self>()
            .property("X", |p: &Pair| p.x)
            .property("Y", |p: &Pair| p.y.clone())
            .property("Buddy", |p: &Pair| p.buddy.borrow().clone())
            .field("Grade", |p: &Pair| p.grade)
            .build()
    }
}

fn pair(x: i32, y: &str) -> Rc<Pair> {
    Rc::new(Pair {
        x,
        y: y.to_string(),
        grade: None,
        buddy: RefCell::new(None),
    })
}

struct Holder {
    left: Rc<Pair>,
    right: Rc<Pair>,
}

impl Exportable for Holder {
    const TYPE_NAME: &'static str = "Holder";
    const TYPE_FULL_NAME: &'static str = "demo::Holder";

    fn schema() -> SpecSchema {
        SpecSchema::builder::<Self>()
            .property("Left", |h: &Holder| Rc::clone(&h.left))
            .property("Right", |h: &Holder| Rc::clone(&h.right))
            .build()
    }
}

#[test]
fn every_leaf_kind_and_its_optional_form_classify_as_leaf() {
    let l_descs = vec![
        <i8>::export_type(),
        <i16>::export_type(),
        <i32>::export_type(),
        <i64>::export_type(),
        <u8>::export_type(),
        <u16>::export_type(),
        <u32>::export_type(),
        <u64>::export_type(),
        <f32>::export_type(),
        <f64>::export_type(),
        <SpecDecimal>::export_type(),
        <bool>::export_type(),
        <char>::export_type(),
        <chrono::NaiveDateTime>::export_type(),
        <String>::export_type(),
        <Grade>::export_type(),
    ];
    assert_eq!(l_descs.len(), EnumLeafKind::ALL.len());

    for desc in l_descs {
        assert!(is_leaf(&desc), "{desc:?}");
        assert!(is_leaf(&EnumTypeDesc::Optional(Box::new(desc.clone()))));
    }
    assert!(matches!(
        classify_type(&<Rc<Pair>>::export_type()),
        EnumTypeClass::Composite(c) if c == SpecCompositeType::of::<Pair>()
    ));
    assert!(!is_leaf(&<Vec<i32>>::export_type()));
}

#[test]
fn bare_leaf_tree_round_trips() {
    let tree = build_tree(&1i32, &SpecTreeOptions::default()).expect("tree");
    assert_eq!(tree.n_nodes(), 1);
    assert_eq!(tree.text().map(str::parse::<i32>), Some(Ok(1)));
}

#[test]
fn self_reference_is_truncated() {
    let a = pair(1, "a");
    *a.buddy.borrow_mut() = Some(Rc::clone(&a));

    let tree = build_tree(&a, &SpecTreeOptions::default()).expect("tree");
    let buddy = tree.children()[0].child("Buddy").expect("Buddy");
    assert!(buddy.children()[0].is_recursive());
    assert!(tree.depth() <= 4);

    *a.buddy.borrow_mut() = None;
}

#[test]
fn diamond_sharing_is_expanded_twice() {
    let shared = pair(9, "s");
    let holder = Rc::new(Holder {
        left: Rc::clone(&shared),
        right: Rc::clone(&shared),
    });

    let tree = build_tree(&holder, &SpecTreeOptions::default()).expect("tree");
    let obj = &tree.children()[0];
    for c_side in ["Left", "Right"] {
        let side = &obj.child(c_side).expect("side").children()[0];
        assert!(!side.is_recursive(), "{c_side} truncated");
        assert_eq!(side.child("X").and_then(|n| n.text()), Some("9"));
    }
}

#[test]
fn unset_root_fails_for_any_type() {
    let opts = SpecTreeOptions::default();
    assert!(matches!(
        build_tree(&None::<i32>, &opts),
        Err(ExportError::InvalidInput(_))
    ));
    assert!(matches!(
        build_tree(&None::<Rc<Pair>>, &opts),
        Err(ExportError::InvalidInput(_))
    ));
    assert!(matches!(
        build_tree(&None::<Vec<String>>, &opts),
        Err(ExportError::InvalidInput(_))
    ));
}

#[test]
fn composite_table_has_leaf_columns_in_member_order() {
    let table = build_table(&[pair(1, "a"), pair(2, "b")], &SpecTableOptions::default())
        .expect("table");

    assert_eq!(table.headers(), vec!["X", "Y", "Grade"]);
    assert_eq!(table.dropped_members, vec!["Buddy"]);
    assert_eq!(
        table.render_rows("%Y"),
        vec![vec!["1", "a", ""], vec!["2", "b", ""]]
    );
}

#[test]
fn string_table_is_single_headerless_column() {
    let table = build_table(&["Test1", "Test2"], &SpecTableOptions::default()).expect("table");
    assert!(!table.has_header());
    assert_eq!(table.width(), 1);
    assert_eq!(table.render_rows("%Y"), vec![vec!["Test1"], vec!["Test2"]]);
}

#[test]
fn trim_flag_controls_whitespace() {
    let l_rows = vec![pair(1, "  Foo  ")];
    let raw = build_table(&l_rows, &SpecTableOptions::default()).expect("table");
    let trimmed = build_table(&l_rows, &SpecTableOptions::default().with_trim(true)).expect("table");

    assert_eq!(raw.render_rows("%Y")[0][1], "  Foo  ");
    assert_eq!(trimmed.render_rows("%Y")[0][1], "Foo");
}

#[test]
fn date_times_follow_the_run_format() {
    let dt = NaiveDate::from_ymd_opt(2020, 1, 31)
        .and_then(|d| d.and_hms_opt(8, 0, 0))
        .expect("valid date");
    let options = SpecTreeOptions {
        datetime_format: "%d/%m/%Y".to_string(),
        ..SpecTreeOptions::default()
    };
    let tree = build_tree(&dt, &options).expect("tree");
    assert_eq!(tree.text(), Some("31/01/2020"));

    let table = build_table(&[dt], &SpecTableOptions::default()).expect("table");
    assert_eq!(table.columns[0].format_hint, EnumFormatHint::DateTime);
}

#[test]
fn enum_members_render_variant_names() {
    let p = Rc::new(Pair {
        x: 0,
        y: String::new(),
        grade: Some(Grade::High),
        buddy: RefCell::new(None),
    });
    let tree = build_tree(&p, &SpecTreeOptions::default()).expect("tree");
    let grade = tree.children()[0].child("Grade").expect("Grade");
    assert_eq!(grade.text(), Some("High"));
    assert_eq!(grade.type_label, "demo::Grade?");
}
