use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const GHS_CURRENCY_CODE: &str = "GHS";
pub const PESEWAS_PER_CEDI: i64 = 100;

//--------------------------------------      Pesewas       ---------------------------------------------------------
/// An amount of Ghana cedis, held in the minor unit. This is the unit the payment gateway charges in.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Pesewas(i64);

op!(binary Pesewas, Add, add);
op!(binary Pesewas, Sub, sub);
op!(inplace Pesewas, AddAssign, add_assign);
op!(inplace Pesewas, SubAssign, sub_assign);
op!(unary Pesewas, Neg, neg);

impl Mul<i64> for Pesewas {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Pesewas {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in pesewas: {0}")]
pub struct PesewasConversionError(String);

impl From<i64> for Pesewas {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Pesewas {
    type Error = PesewasConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value)
            .map(Self)
            .map_err(|_| PesewasConversionError(format!("{value} is too large to convert to Pesewas")))
    }
}

impl Display for Pesewas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per_cedi = PESEWAS_PER_CEDI.unsigned_abs();
        write!(f, "{sign}₵{}.{:02}", abs / per_cedi, abs % per_cedi)
    }
}

impl Pesewas {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_cedis(cedis: i64) -> Self {
        Self(cedis * PESEWAS_PER_CEDI)
    }

    /// The amount in cedis, as used in user-facing copy, e.g. "20.00".
    pub fn cedis_string(&self) -> String {
        let abs = self.0.unsigned_abs();
        let per_cedi = PESEWAS_PER_CEDI.unsigned_abs();
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{sign}{}.{:02}", abs / per_cedi, abs % per_cedi)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}
