use super::ModelId;

/// A navigation from one model to another.
#[derive(Debug, Clone)]
pub struct Navigation {
    pub name: String,

    pub target: ModelId,

    /// True if the navigation reaches many instances
    pub collection: bool,
}
