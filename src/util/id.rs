//! Macro for ID newtypes.

macro_rules! make_id_impl {
    ($name:ident) => {
        impl $name {
            /// Allocate a fresh, never reused ID.
            pub fn new() -> Self {
                static NEXT: core::sync::atomic::AtomicUsize =
                    core::sync::atomic::AtomicUsize::new(0);
                Self(NEXT.fetch_add(1, core::sync::atomic::Ordering::Relaxed))
            }

            /// The raw numeric value.
            pub fn raw(&self) -> usize {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

macro_rules! make_id {
    (pub $name:ident) => {
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(usize);
        make_id_impl!($name);
    };

    ($name:ident) => {
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        struct $name(usize);
        make_id_impl!($name);
    };
}
