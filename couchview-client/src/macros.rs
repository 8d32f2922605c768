//! Builder plumbing shared by the query types.

/// Generates consuming setters that forward to the same-named setter on
/// the wrapped options value in `self.options`.
macro_rules! delegate_options {
    ($( $(#[$meta:meta])* $name:ident ( $($arg:ident : $ty:ty),* ) );* $(;)?) => {
        $(
            $(#[$meta])*
            pub fn $name(mut self, $($arg: $ty),*) -> Self {
                self.options = self.options.$name($($arg),*);
                self
            }
        )*
    };
}

/// Like `delegate_options!` for setters that serialize an arbitrary value
/// and can fail.
macro_rules! delegate_fallible_options {
    ($( $name:ident );* $(;)?) => {
        $(
            pub fn $name<T: serde::Serialize + ?Sized>(
                mut self,
                value: &T,
            ) -> couchview_core::CouchResult<Self> {
                self.options = self.options.$name(value)?;
                Ok(self)
            }
        )*
    };
}
