use std::sync::Arc;

use super::{Closure, Val};

impl From<String> for Val {
    #[inline]
    fn from(s: String) -> Self {
        Val::Str(Arc::<str>::from(s))
    }
}

impl From<&str> for Val {
    #[inline]
    fn from(s: &str) -> Self {
        Val::Str(Arc::from(s))
    }
}

impl From<Arc<str>> for Val {
    #[inline]
    fn from(s: Arc<str>) -> Self {
        Val::Str(s)
    }
}

impl From<i64> for Val {
    #[inline]
    fn from(i: i64) -> Self {
        Val::Int(i)
    }
}

impl From<i32> for Val {
    #[inline]
    fn from(i: i32) -> Self {
        Val::Int(i as i64)
    }
}

impl From<f64> for Val {
    #[inline]
    fn from(f: f64) -> Self {
        Val::Float(f)
    }
}

impl From<bool> for Val {
    #[inline]
    fn from(b: bool) -> Self {
        Val::Bool(b)
    }
}

impl From<()> for Val {
    #[inline]
    fn from(_: ()) -> Self {
        Val::Nil
    }
}

impl From<Closure> for Val {
    #[inline]
    fn from(c: Closure) -> Self {
        Val::Callable(c)
    }
}

impl<T> From<Option<T>> for Val
where
    T: Into<Val>,
{
    fn from(o: Option<T>) -> Self {
        match o {
            Some(v) => v.into(),
            None => Val::Nil,
        }
    }
}
