/// Shared by every request handler. Built once at startup.
#[derive(Debug, Clone)]
pub struct ApiState<C> {
    completer: C,
}

impl<C> From<C> for ApiState<C> {
    fn from(completer: C) -> Self {
        Self { completer }
    }
}

impl<C> ApiState<C> {
    pub fn completer(&self) -> &C {
        &self.completer
    }
}
