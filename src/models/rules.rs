use crate::models::{FieldLabel, Script};

/// Detector class ids, in the order the region model was trained with.
pub const CLASS_TABLE: [(i64, FieldLabel); 7] = [
    (1, FieldLabel::Add1),
    (2, FieldLabel::Add2),
    (3, FieldLabel::BD),
    (4, FieldLabel::Name1),
    (5, FieldLabel::Name2),
    (6, FieldLabel::Num1),
    (7, FieldLabel::Num2),
];

pub fn label_for_class(class_id: i64) -> Option<FieldLabel> {
    CLASS_TABLE
        .iter()
        .find(|(id, _)| *id == class_id)
        .map(|(_, label)| *label)
}

/// Recognition profile each field is read with. `BD` has none.
pub fn script_for(label: FieldLabel) -> Option<Script> {
    match label {
        FieldLabel::Add1
        | FieldLabel::Add2
        | FieldLabel::Name1
        | FieldLabel::Name2
        | FieldLabel::Num1 => Some(Script::Arabic),
        FieldLabel::Num2 => Some(Script::English),
        FieldLabel::BD => None,
    }
}

/// Arabic lines are scanned left to right but read right to left.
pub fn reverses_tokens(label: FieldLabel) -> bool {
    script_for(label) == Some(Script::Arabic)
}
