//! Numeric values of every supported width.
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A number, tagged with the width and signedness it was parsed or constructed with.
///
/// Equality, ordering and hashing are numeric: `Num::I32(1)` equals `Num::F64(1.0)`.
/// NaN equals NaN and sorts above every other number, which keeps the order total.
#[derive(Clone, Copy, Debug)]
pub enum Num {
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum IntKind {
    I32,
    I64,
    U32,
    U64,
}

impl Num {
    pub fn as_f64(self) -> f64 {
        match self {
            Num::I32(v) => v as f64,
            Num::I64(v) => v as f64,
            Num::U32(v) => v as f64,
            Num::U64(v) => v as f64,
            Num::F32(v) => v as f64,
            Num::F64(v) => v,
        }
    }

    pub fn is_integer(self) -> bool {
        !matches!(self, Num::F32(_) | Num::F64(_))
    }

    pub fn is_nan(self) -> bool {
        self.as_f64().is_nan()
    }

    /// The exact integral value of this number, if it has one.
    fn exact(self) -> Option<i128> {
        match self {
            Num::I32(v) => Some(v as i128),
            Num::I64(v) => Some(v as i128),
            Num::U32(v) => Some(v as i128),
            Num::U64(v) => Some(v as i128),
            Num::F32(_) | Num::F64(_) => {
                let f = self.as_f64();
                if f.is_finite() && f.fract() == 0.0 && f.abs() < 1.0e38 {
                    Some(f as i128)
                } else {
                    None
                }
            }
        }
    }

    fn int_kind(self) -> Option<IntKind> {
        match self {
            Num::I32(_) => Some(IntKind::I32),
            Num::I64(_) => Some(IntKind::I64),
            Num::U32(_) => Some(IntKind::U32),
            Num::U64(_) => Some(IntKind::U64),
            Num::F32(_) | Num::F64(_) => None,
        }
    }

    fn int_value(self) -> i128 {
        match self {
            Num::I32(v) => v as i128,
            Num::I64(v) => v as i128,
            Num::U32(v) => v as i128,
            Num::U64(v) => v as i128,
            Num::F32(v) => v as i128,
            Num::F64(v) => v as i128,
        }
    }

    pub fn to_i32(self) -> Option<i32> {
        self.exact().and_then(|v| i32::try_from(v).ok())
    }

    pub fn to_i64(self) -> Option<i64> {
        self.exact().and_then(|v| i64::try_from(v).ok())
    }

    pub fn to_u32(self) -> Option<u32> {
        self.exact().and_then(|v| u32::try_from(v).ok())
    }

    pub fn to_u64(self) -> Option<u64> {
        self.exact().and_then(|v| u64::try_from(v).ok())
    }

    pub fn to_usize(self) -> Option<usize> {
        self.exact().and_then(|v| usize::try_from(v).ok())
    }

    fn floats(self, rhs: Num) -> (f64, f64, bool) {
        let single = matches!(
            (self, rhs),
            (Num::F32(_), Num::F32(_))
        );
        (self.as_f64(), rhs.as_f64(), single)
    }

    fn from_float(v: f64, single: bool) -> Num {
        if single {
            Num::F32(v as f32)
        } else {
            Num::F64(v)
        }
    }

    pub fn plus(self, rhs: Num) -> Num {
        match (self.int_kind(), rhs.int_kind()) {
            (Some(a), Some(b)) => narrow(self.int_value() + rhs.int_value(), join(a, b)),
            _ => {
                let (a, b, single) = self.floats(rhs);
                Num::from_float(a + b, single)
            }
        }
    }

    pub fn minus(self, rhs: Num) -> Num {
        match (self.int_kind(), rhs.int_kind()) {
            (Some(a), Some(b)) => narrow(self.int_value() - rhs.int_value(), join(a, b)),
            _ => {
                let (a, b, single) = self.floats(rhs);
                Num::from_float(a - b, single)
            }
        }
    }

    pub fn times(self, rhs: Num) -> Num {
        match (self.int_kind(), rhs.int_kind()) {
            (Some(a), Some(b)) => match self.int_value().checked_mul(rhs.int_value()) {
                Some(v) => narrow(v, join(a, b)),
                None => Num::F64(self.as_f64() * rhs.as_f64()),
            },
            _ => {
                let (a, b, single) = self.floats(rhs);
                Num::from_float(a * b, single)
            }
        }
    }

    /// Integer division stays integral only when it is exact.
    pub fn divide(self, rhs: Num) -> Num {
        match (self.int_kind(), rhs.int_kind()) {
            (Some(a), Some(b)) => {
                let (x, y) = (self.int_value(), rhs.int_value());
                if y != 0 && x % y == 0 {
                    narrow(x / y, join(a, b))
                } else {
                    Num::F64(self.as_f64() / rhs.as_f64())
                }
            }
            _ => {
                let (a, b, single) = self.floats(rhs);
                Num::from_float(a / b, single)
            }
        }
    }

    pub fn modulo(self, rhs: Num) -> Num {
        match (self.int_kind(), rhs.int_kind()) {
            (Some(a), Some(b)) => {
                let y = rhs.int_value();
                if y == 0 {
                    Num::F64(f64::NAN)
                } else {
                    narrow(self.int_value() % y, join(a, b))
                }
            }
            _ => {
                let (a, b, single) = self.floats(rhs);
                Num::from_float(a % b, single)
            }
        }
    }

    pub fn negative(self) -> Num {
        match self {
            Num::F32(v) => Num::F32(-v),
            Num::F64(v) => Num::F64(-v),
            Num::I32(_) | Num::U32(_) => narrow(-self.int_value(), IntKind::I32),
            Num::I64(_) | Num::U64(_) => narrow(-self.int_value(), IntKind::I64),
        }
    }

    pub fn bit_and(self, rhs: Num) -> Option<Num> {
        self.bitwise(rhs, |a, b| a & b)
    }

    pub fn bit_or(self, rhs: Num) -> Option<Num> {
        self.bitwise(rhs, |a, b| a | b)
    }

    pub fn bit_xor(self, rhs: Num) -> Option<Num> {
        self.bitwise(rhs, |a, b| a ^ b)
    }

    pub fn bit_not(self) -> Option<Num> {
        match self {
            Num::I32(v) => Some(Num::I32(!v)),
            Num::I64(v) => Some(Num::I64(!v)),
            Num::U32(v) => Some(Num::U32(!v)),
            Num::U64(v) => Some(Num::U64(!v)),
            Num::F32(_) | Num::F64(_) => None,
        }
    }

    fn bitwise(self, rhs: Num, op: impl Fn(u64, u64) -> u64) -> Option<Num> {
        let kind = join(self.int_kind()?, rhs.int_kind()?);
        // Operate on the two's complement bit patterns, then truncate to the joined width.
        let bits = op(self.int_value() as u64, rhs.int_value() as u64);
        Some(match kind {
            IntKind::I32 => Num::I32(bits as i32),
            IntKind::U32 => Num::U32(bits as u32),
            IntKind::U64 => Num::U64(bits),
            IntKind::I64 => Num::I64(bits as i64),
        })
    }
}

fn join(a: IntKind, b: IntKind) -> IntKind {
    match (a, b) {
        (IntKind::I32, IntKind::I32) => IntKind::I32,
        (IntKind::U32, IntKind::U32) => IntKind::U32,
        (IntKind::U32 | IntKind::U64, IntKind::U32 | IntKind::U64) => IntKind::U64,
        _ => IntKind::I64,
    }
}

/// Fits an integer result into the narrowest representation at least as wide as `kind`.
fn narrow(v: i128, kind: IntKind) -> Num {
    match kind {
        IntKind::I32 => {
            if let Ok(n) = i32::try_from(v) {
                return Num::I32(n);
            }
        }
        IntKind::U32 => {
            if let Ok(n) = u32::try_from(v) {
                return Num::U32(n);
            }
            if let Ok(n) = u64::try_from(v) {
                return Num::U64(n);
            }
        }
        IntKind::U64 => {
            if let Ok(n) = u64::try_from(v) {
                return Num::U64(n);
            }
        }
        IntKind::I64 => {}
    }
    match i64::try_from(v) {
        Ok(n) => Num::I64(n),
        Err(_) => Num::F64(v as f64),
    }
}

fn total_cmp(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

impl PartialEq for Num {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Num {}

impl PartialOrd for Num {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Num {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.exact(), other.exact()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => total_cmp(self.as_f64(), other.as_f64()),
        }
    }
}

impl Hash for Num {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.exact() {
            Some(v) => {
                0u8.hash(state);
                v.hash(state);
            }
            None => {
                1u8.hash(state);
                let f = self.as_f64();
                if f.is_nan() {
                    u64::MAX.hash(state);
                } else {
                    f.to_bits().hash(state);
                }
            }
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, v: f64, repr: String) -> fmt::Result {
    if v.is_nan() {
        f.write_str("NaN")
    } else if v.is_infinite() {
        f.write_str(if v > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        f.write_str(&repr)
    }
}

/// The canonical Recon text of the number.
impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Num::I32(v) => write!(f, "{v}"),
            Num::I64(v) => write!(f, "{v}"),
            Num::U32(v) => write!(f, "0x{v:08X}"),
            Num::U64(v) => write!(f, "0x{v:016X}"),
            Num::F32(v) => write_float(f, v as f64, format!("{v:?}")),
            Num::F64(v) => write_float(f, v, format!("{v:?}")),
        }
    }
}

macro_rules! num_from {
    ($($t:ty => $variant:ident),*) => {
        $(
            impl From<$t> for Num {
                fn from(v: $t) -> Self {
                    Num::$variant(v)
                }
            }
        )*
    };
}

num_from!(i32 => I32, i64 => I64, u32 => U32, u64 => U64, f32 => F32, f64 => F64);
