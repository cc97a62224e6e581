//! Typed access to private fields of external types
//!
//! Test fixtures sometimes need to rewrite state that a framework type keeps
//! private, such as the case directory a time object believes it owns. The
//! [`steal_member!`] macro generates an *accessor token*: a zero-sized type
//! implementing [`MemberAccessor`] that turns `&mut Owner` into
//! `&mut Field` without touching the owner's source.
//!
//! # Layout contract
//!
//! Rust gives no way to name a private field from outside its module, so the
//! caller describes the owner's layout with a *mirror*: a `#[repr(C)]` struct
//! whose fields are the leading fields of the owner, in declaration order and
//! with identical types. The owner must itself be `#[repr(C)]`. Under that
//! contract a field's offset in the mirror equals its offset in the owner.
//!
//! The macro checks what it can at compile time (the mirror is no larger and
//! no more aligned than the owner, and the stolen field has the declared
//! type in the mirror). Everything else is a precondition: a mirror that
//! disagrees with the owner's real layout is undefined behavior. That is why
//! the macro syntax requires the `unsafe` keyword.
//!
//! # Example
//!
//! ```ignore
//! #[repr(C)]
//! struct TimeLayout {
//!     root_path: PathBuf,
//!     case_name: PathBuf,
//! }
//!
//! steal_member! {
//!     /// Grants write access to `Time::case_name`.
//!     pub unsafe TimeCaseName for Time as TimeLayout => case_name: PathBuf
//! }
//!
//! *TimeCaseName::get_mut(&mut run_time) = "processor0".into();
//! ```

/// A generated accessor for one private field of `Owner`.
///
/// Tokens are plain zero-sized types; two tokens for the same field declared
/// in different modules are unrelated types and never conflict.
///
/// # Safety
///
/// `FIELD_OFFSET` must be the byte offset of a field of type `Field` inside
/// every fully constructed `Owner`. Implement this trait through
/// [`steal_member!`] only.
pub unsafe trait MemberAccessor {
    /// Type whose field is accessed
    type Owner;
    /// Declared type of the field
    type Field;

    /// Name of the field, for diagnostics
    const FIELD_NAME: &'static str;

    /// Byte offset of the field inside `Owner`
    const FIELD_OFFSET: usize;

    /// Shared reference to the field.
    ///
    /// `owner` must be fully constructed; the reference borrows it.
    fn get(owner: &Self::Owner) -> &Self::Field {
        let base = (owner as *const Self::Owner).cast::<u8>();
        // SAFETY: the trait contract places a valid, initialized `Field` at
        // `FIELD_OFFSET` inside a live `Owner`, and the returned lifetime is
        // tied to the shared borrow of `owner`.
        unsafe { &*base.add(Self::FIELD_OFFSET).cast::<Self::Field>() }
    }

    /// Mutable reference to the field.
    ///
    /// `owner` must be fully constructed; the reference borrows it.
    fn get_mut(owner: &mut Self::Owner) -> &mut Self::Field {
        let base = (owner as *mut Self::Owner).cast::<u8>();
        // SAFETY: as in `get`; the exclusive borrow of `owner` guarantees no
        // other reference into it is alive.
        unsafe { &mut *base.add(Self::FIELD_OFFSET).cast::<Self::Field>() }
    }

    /// Overwrite the field, returning the previous value.
    fn replace(owner: &mut Self::Owner, value: Self::Field) -> Self::Field {
        std::mem::replace(Self::get_mut(owner), value)
    }
}

/// Mutable reference to the field selected by accessor `A`.
pub fn member_mut<A: MemberAccessor>(owner: &mut A::Owner) -> &mut A::Field {
    A::get_mut(owner)
}

/// Generate an accessor token for a private field.
///
/// ```ignore
/// steal_member! {
///     pub unsafe Token for Owner as OwnerLayout => field: FieldType
/// }
/// ```
///
/// `OwnerLayout` must be a `#[repr(C)]` struct visible at the call site
/// mirroring the leading fields of the `#[repr(C)]` type `Owner` up to and
/// including `field`. See the [module documentation](crate::accessor).
#[macro_export]
macro_rules! steal_member {
    (
        $(#[$meta:meta])*
        $vis:vis unsafe $token:ident for $owner:ty as $layout:ty => $field:ident : $field_ty:ty
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        $vis struct $token;

        const _: () = {
            assert!(
                ::core::mem::size_of::<$layout>() <= ::core::mem::size_of::<$owner>(),
                "layout mirror is larger than the owner type"
            );
            assert!(
                ::core::mem::align_of::<$layout>() <= ::core::mem::align_of::<$owner>(),
                "layout mirror is more aligned than the owner type"
            );
        };

        const _: fn(&$layout) -> &$field_ty = |layout| &layout.$field;

        // SAFETY: the invoker asserted (via the `unsafe` keyword) that
        // `$layout` mirrors the leading `#[repr(C)]` fields of `$owner`, so
        // the mirror's offset of `$field` is the owner's.
        unsafe impl $crate::accessor::MemberAccessor for $token {
            type Owner = $owner;
            type Field = $field_ty;

            const FIELD_NAME: &'static str = ::core::stringify!($field);
            const FIELD_OFFSET: usize = ::core::mem::offset_of!($layout, $field);
        }
    };
}
