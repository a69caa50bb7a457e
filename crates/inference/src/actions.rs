use serde::Serialize;

/// Downstream sorting command derived from a classified label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    SortPlastic,
    SortTinCan,
    Reject,
}

impl Action {
    /// Exact-label lookup. Anything unmapped (including "Other" and the
    /// "Unknown" sentinel) is rejected.
    pub fn for_label(label: &str) -> Self {
        match label {
            "Plastic Bottle" => Action::SortPlastic,
            "Tin Can" => Action::SortTinCan,
            _ => Action::Reject,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::SortPlastic => "sort_plastic",
            Action::SortTinCan => "sort_tin_can",
            Action::Reject => "reject",
        }
    }
}
