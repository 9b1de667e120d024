mod ops;

pub use ops::{BinOp, UnaryOp};
pub(crate) use ops::{err_op, err_unary};
