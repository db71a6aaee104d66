use crate::error::Result;
use crate::value::Fields;

/// A named, pure state transform.
///
/// A step reads the current fields and returns only the fields it changed.
/// It must not depend on anything but its input, and it never writes the
/// execution log.
pub trait Step: Send + Sync + 'static {
    /// Step identifier, as referenced by graph nodes.
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str {
        ""
    }

    /// Compute the partial update for the given fields.
    fn invoke(&self, fields: &Fields) -> Result<Fields>;
}
