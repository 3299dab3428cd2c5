use super::{FutureError, FutureResult};
use std::any::{Any, TypeId};
use std::fmt;

/// Runtime identity of the value type carried by a future or a port
#[derive(Clone, Copy)]
pub struct DataInfo {
    type_id: TypeId,
    type_name: &'static str,
}

impl DataInfo {
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Fails with `TypeMismatch` unless the carried type is exactly `T`
    pub fn check<T: Any>(&self) -> FutureResult<()> {
        if self.is::<T>() {
            Ok(())
        } else {
            Err(FutureError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                found: self.type_name,
            })
        }
    }

    /// Fails with `TypeMismatch` unless both sides carry the same type
    pub fn check_compatible(&self, other: &DataInfo) -> FutureResult<()> {
        if self == other {
            Ok(())
        } else {
            Err(FutureError::TypeMismatch {
                expected: self.type_name,
                found: other.type_name,
            })
        }
    }
}

impl PartialEq for DataInfo {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for DataInfo {}

impl fmt::Debug for DataInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataInfo({})", self.type_name)
    }
}
