/// The subset of a model's "grade" the orchestrator cares about: whether
/// the model supports the modern install-mode flow at all (§4.8 step 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelGrade {
    Dangerous,
    Signed,
    Secured,
    /// Pre-UC20 models have no install mode; the orchestrator refuses to
    /// run against one.
    Classic,
}

impl ModelGrade {
    pub fn has_install_mode(self) -> bool { self != ModelGrade::Classic }
}

/// The minimal facts the orchestrator needs about the target model. Full
/// model assertion parsing lives outside the core (§1's scope note).
#[derive(Debug, Clone)]
pub struct Model {
    pub grade: ModelGrade,
}

impl Model {
    pub fn new(grade: ModelGrade) -> Self { Model { grade } }
}
