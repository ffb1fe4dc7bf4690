//! Byte order normalization
//!
//! The workstation is little-endian. Values bound for (or read from) a
//! big-endian target have their bytes reversed; everything else passes
//! through untouched.

/// Integral types whose byte order can be reversed
pub trait ByteOrderNormalize: Copy {
    /// Reverse the byte order of the value
    fn reverse_bytes(self) -> Self;
}

macro_rules! impl_normalize {
    ($($t:ty),*) => {
        $(
            impl ByteOrderNormalize for $t {
                #[inline]
                fn reverse_bytes(self) -> Self {
                    self.swap_bytes()
                }
            }
        )*
    };
}

impl_normalize!(u8, i8, u16, i16, u32, i32);

/// Return `value` with its byte order reversed iff the target is big-endian
#[inline]
pub fn normalize<T: ByteOrderNormalize>(value: T, target_is_big_endian: bool) -> T {
    if target_is_big_endian {
        value.reverse_bytes()
    } else {
        value
    }
}
