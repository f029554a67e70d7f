use std::fmt;

use serde::Serialize;

/// Code de retour d'une commande de session.
///
/// Les valeurs numériques sont stables : elles traversent la frontière
/// de service telles quelles.
///
/// # Example
/// ```
/// use ip_core::ResultCode;
/// assert_eq!(ResultCode::ErrBadValue.as_i32(), -3);
/// assert!(ResultCode::OkScaleMax.is_ok());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[repr(i32)]
pub enum ResultCode {
    /// Success.
    Ok = 0,
    /// Success; the hardware zoom saturated at its maximum.
    OkScaleMax = 1,
    /// Success; the hardware zoom saturated at its minimum.
    OkScaleMin = 2,
    /// Malformed argument (null data, bad URI, non-positive scale).
    ErrParameter = -1,
    /// Operation not allowed in the current state or transform failure.
    ErrInvalidOperation = -2,
    /// Out-of-range value (bad crop rectangle, bad buffer).
    ErrBadValue = -3,
    /// Allocation failure or image over the size ceiling.
    ErrNoMemory = -4,
    /// Decoder failure.
    ErrDecoder = -5,
    /// Display device or sysfs node could not be opened.
    ErrOpenSysfs = -6,
}

impl ResultCode {
    /// Valeur numérique du code.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// True for `Ok`, `OkScaleMax` and `OkScaleMin`.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        self.as_i32() >= 0
    }

    /// Nom symbolique, tel qu'affiché dans les journaux.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::OkScaleMax => "OK_SCALE_MAX",
            Self::OkScaleMin => "OK_SCALE_MIN",
            Self::ErrParameter => "ERR_PARAMETER",
            Self::ErrInvalidOperation => "ERR_INVALID_OPERATION",
            Self::ErrBadValue => "ERR_BAD_VALUE",
            Self::ErrNoMemory => "ERR_NO_MEMORY",
            Self::ErrDecoder => "ERR_DECODER",
            Self::ErrOpenSysfs => "ERR_OPEN_SYSFS",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_values_are_stable() {
        let expected = [
            (ResultCode::Ok, 0),
            (ResultCode::OkScaleMax, 1),
            (ResultCode::OkScaleMin, 2),
            (ResultCode::ErrParameter, -1),
            (ResultCode::ErrInvalidOperation, -2),
            (ResultCode::ErrBadValue, -3),
            (ResultCode::ErrNoMemory, -4),
            (ResultCode::ErrDecoder, -5),
            (ResultCode::ErrOpenSysfs, -6),
        ];
        for (code, value) in expected {
            assert_eq!(code.as_i32(), value, "{code}");
            assert_eq!(code.is_ok(), value >= 0);
        }
    }

    #[test]
    fn display_includes_name_and_value() {
        assert_eq!(ResultCode::ErrNoMemory.to_string(), "ERR_NO_MEMORY (-4)");
    }
}
