//! Operator boilerplate for newtype wrappers around a single numeric field.
//!
//! ```rust,ignore
//! op!(binary Pesewas, Add, add);
//! op!(inplace Pesewas, AddAssign, add_assign);
//! op!(unary Pesewas, Neg, neg);
//! ```

#[macro_export]
macro_rules! op {
    (binary $unit_type:ty, $imp:ident, $method:ident) => {
        impl std::ops::$imp for $unit_type {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self::Output {
                Self(std::ops::$imp::$method(self.0, rhs.0))
            }
        }
    };

    (inplace $unit_type:ty, $imp:ident, $method:ident) => {
        impl std::ops::$imp for $unit_type {
            fn $method(&mut self, rhs: Self) {
                std::ops::$imp::$method(&mut self.0, rhs.0)
            }
        }
    };

    (unary $unit_type:ty, $imp:ident, $method:ident) => {
        impl std::ops::$imp for $unit_type {
            type Output = Self;

            fn $method(self) -> Self::Output {
                Self(std::ops::$imp::$method(self.0))
            }
        }
    };
}
