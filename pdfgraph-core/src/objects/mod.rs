mod dictionary;
mod operator;
mod primitive;
mod stream;

pub use dictionary::{DictKind, Dictionary};
pub use operator::Operator;
pub use primitive::{Object, ObjectId, ObjectKind};
pub use stream::{Stream, StreamContent};
