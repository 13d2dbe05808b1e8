use crate::errors::SharedError;

/// Receiving side of a stream: zero or more `next` calls followed by at most one
/// terminal call (`error` or `complete`).
pub trait Observer {
    type NextFnType;

    fn next(&mut self, _: Self::NextFnType);
    fn complete(&mut self);
    fn error(&mut self, _: SharedError);
}
