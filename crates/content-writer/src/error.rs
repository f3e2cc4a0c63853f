#[derive(Debug, Fail)]
pub enum ContentError {
    #[fail(display = "cannot write filesystem content of source:{}: cannot observe file write: {}", source, why)]
    Observed { source: String, why: String },

    #[fail(display = "cannot write filesystem content of source:{}: {}", source, why)]
    Io { source: String, why: std::io::Error },
}
