// TODO:
// All of this newtype stuff seems like it absolutely should be easier to do.
// 1. Sending types like `newtype_num!(@impl $ident, $ty)` does not work
//    because the type will not match the `$ty` token so every type must be
//    explicitly enumerated in the main `newtype_num` pattern.
// 2. Using generics for the conversion impls does not work because
//    specialization is not stable, and core includes a generic
//    `impl <T> From<T> for T`, which conflicts with
//    `impl <T: std::convert::From<$ty>> From<T> for $ident`.

#[macro_export]
macro_rules! newtype_num {
    (@from $ident:ident, $($from_ty:ty)+) => {
        $(impl ::core::convert::From<$from_ty> for $ident {
            fn from(value: $from_ty) -> Self {
                Self(value.into())
            }
        })+
    };

    (@into $ident:ident, $($into_ty:ty)+) => {
        $(impl ::core::convert::From<$ident> for $into_ty {
            fn from(value: $ident) -> Self {
                <$into_ty>::from(value.0)
            }
        })+
    };

    (@try_into $ident:ident, $ty:ty, $($try_ty:ty)+) => {
        $(impl ::core::convert::TryFrom<$try_ty> for $ident {
            type Error = <$ty as ::core::convert::TryFrom<$try_ty>>::Error;
            fn try_from(value: $try_ty) -> ::core::result::Result<Self, Self::Error> {
                Ok(Self(::core::convert::TryFrom::try_from(value)?))
            }
        })+
    };

    (@decl [$($meta:meta),*], $vis:vis, $ident:ident, $ty_vis:vis, $ty:ty) => {
        #[derive(
            ::core::clone::Clone,
            ::core::marker::Copy,
            ::core::default::Default,
            ::core::cmp::Eq, ::core::cmp::Ord, ::core::cmp::PartialEq, ::core::cmp::PartialOrd,
            ::core::hash::Hash,
            ::derive_more::Display,
            ::derive_more::Add, ::derive_more::Sub,
            ::derive_more::AddAssign, ::derive_more::SubAssign,
        )]
        $(#[$meta])*
        $vis struct $ident($ty_vis $ty);

        impl $ident {
            #[must_use]
            pub const fn get(self) -> $ty {
                self.0
            }
        }
    };

    (@impl $ident:ident, i16) => {
        $crate::newtype_num!(@from $ident, i8 u8 i16);
        $crate::newtype_num!(@into $ident, i16 i32 i64 i128);
        $crate::newtype_num!(@try_into $ident, i16, u16 i32 u32 i64 u64 i128 u128);
    };
    (@impl $ident:ident, u16) => {
        $crate::newtype_num!(@from $ident, u8 u16);
        $crate::newtype_num!(@into $ident, u16 u32 u64 u128);
        $crate::newtype_num!(@try_into $ident, u16, i8 i16 i32 u32 i64 u64 i128 u128);
    };
    (@impl $ident:ident, i32) => {
        $crate::newtype_num!(@from $ident, i8 u8 i16 u16 i32);
        $crate::newtype_num!(@into $ident, i32 i64 i128);
        $crate::newtype_num!(@try_into $ident, i32, u32 i64 u64 i128 u128);
    };
    (@impl $ident:ident, u32) => {
        $crate::newtype_num!(@from $ident, u8 u16 u32);
        $crate::newtype_num!(@into $ident, u32 u64 i128 u128);
        $crate::newtype_num!(@try_into $ident, u32, i8 i16 i32 i64 u64 i128 u128);
    };
    (@impl $ident:ident, i64) => {
        $crate::newtype_num!(@from $ident, i8 u8 i16 u16 i32 u32 i64);
        $crate::newtype_num!(@into $ident, i64 i128);
        $crate::newtype_num!(@try_into $ident, i64, u64 i128 u128);
    };
    (@impl $ident:ident, u64) => {
        $crate::newtype_num!(@from $ident, u8 u16 u32 u64);
        $crate::newtype_num!(@into $ident, u64 u128);
        $crate::newtype_num!(@try_into $ident, u64, i8 i16 i32 i64 i128 u128);
    };
    (@impl $ident:ident, usize) => {
        $crate::newtype_num!(@from $ident, u8 u16 u32 usize);
        $crate::newtype_num!(@into $ident, usize u64 u128);
        $crate::newtype_num!(@try_into $ident, usize, i8 i16 i32 i64 i128);
    };

    ($(#[$meta: meta])* $vis:vis struct $ident:ident($ty_vis:vis i16);) => {
        $crate::newtype_num!(@decl [$($meta),*], $vis, $ident, $ty_vis, i16);
        $crate::newtype_num!(@impl $ident, i16);
    };
    ($(#[$meta: meta])* $vis:vis struct $ident:ident($ty_vis:vis u16);) => {
        $crate::newtype_num!(@decl [$($meta),*], $vis, $ident, $ty_vis, u16);
        $crate::newtype_num!(@impl $ident, u16);
    };
    ($(#[$meta: meta])* $vis:vis struct $ident:ident($ty_vis:vis i32);) => {
        $crate::newtype_num!(@decl [$($meta),*], $vis, $ident, $ty_vis, i32);
        $crate::newtype_num!(@impl $ident, i32);
    };
    ($(#[$meta: meta])* $vis:vis struct $ident:ident($ty_vis:vis u32);) => {
        $crate::newtype_num!(@decl [$($meta),*], $vis, $ident, $ty_vis, u32);
        $crate::newtype_num!(@impl $ident, u32);
    };
    ($(#[$meta: meta])* $vis:vis struct $ident:ident($ty_vis:vis i64);) => {
        $crate::newtype_num!(@decl [$($meta),*], $vis, $ident, $ty_vis, i64);
        $crate::newtype_num!(@impl $ident, i64);
    };
    ($(#[$meta: meta])* $vis:vis struct $ident:ident($ty_vis:vis u64);) => {
        $crate::newtype_num!(@decl [$($meta),*], $vis, $ident, $ty_vis, u64);
        $crate::newtype_num!(@impl $ident, u64);
    };
    ($(#[$meta: meta])* $vis:vis struct $ident:ident($ty_vis:vis usize);) => {
        $crate::newtype_num!(@decl [$($meta),*], $vis, $ident, $ty_vis, usize);
        $crate::newtype_num!(@impl $ident, usize);
    };
}
