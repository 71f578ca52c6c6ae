use std::any::Any;

use thiserror::Error;

/// A type-erased argument or return value.
pub type Value = Box<dyn Any + Send>;

/// Error type raised by resolvers and invoked bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors from taking an argument out of [`Arguments`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("no argument at index {index} (the method received {len})")]
    Missing { index: usize, len: usize },

    #[error("argument {index} was already taken")]
    Taken { index: usize },

    #[error("argument {index} is not a `{expected}`")]
    Mismatch { index: usize, expected: &'static str },
}

/// Resolved arguments, one per declared parameter, in declaration order.
///
/// Method bodies take ownership of each argument with [`Arguments::take`].
#[derive(Debug, Default)]
pub struct Arguments {
    values: Vec<Option<Value>>,
}

impl Arguments {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values: values.into_iter().map(Some).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Move the argument at `index` out as a `T`.
    ///
    /// On a type mismatch the argument stays in place.
    pub fn take<T: Any>(&mut self, index: usize) -> Result<T, ArgumentError> {
        let len = self.values.len();
        let slot = self.values.get_mut(index).ok_or(ArgumentError::Missing { index, len })?;
        let value = slot.take().ok_or(ArgumentError::Taken { index })?;
        match value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => {
                *slot = Some(value);
                Err(ArgumentError::Mismatch {
                    index,
                    expected: std::any::type_name::<T>(),
                })
            }
        }
    }

    /// Borrow the argument at `index` as a `T`, if it is one and has not been taken.
    pub fn get<T: Any>(&self, index: usize) -> Option<&T> {
        self.values.get(index)?.as_ref()?.downcast_ref::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> Arguments {
        Arguments::new(vec![Box::new(String::from("text")), Box::new(42_i64)])
    }

    #[test]
    fn test_take_moves_value_out() {
        let mut args = args();
        assert_eq!(args.len(), 2);
        assert_eq!(args.take::<String>(0).unwrap(), "text");
        assert_eq!(args.take::<i64>(1).unwrap(), 42);
        assert_eq!(args.take::<String>(0), Err(ArgumentError::Taken { index: 0 }));
    }

    #[test]
    fn test_mismatch_leaves_value_in_place() {
        let mut args = args();
        let err = args.take::<u8>(1).unwrap_err();
        assert_eq!(err, ArgumentError::Mismatch { index: 1, expected: "u8" });
        assert_eq!(args.get::<i64>(1), Some(&42));
    }

    #[test]
    fn test_missing_index() {
        let mut args = args();
        assert_eq!(args.take::<i64>(5), Err(ArgumentError::Missing { index: 5, len: 2 }));
        assert!(Arguments::default().is_empty());
    }
}
