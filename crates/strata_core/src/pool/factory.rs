use glam::Vec3;

/// Object-lifecycle primitives for whatever represents a cell locally.
///
/// The core never looks inside a handle; rendering or physics code
/// supplies the implementation.
pub trait CellFactory {
    type Handle;

    fn instantiate(&mut self) -> Self::Handle;

    fn activate(&mut self, handle: &mut Self::Handle);

    fn deactivate(&mut self, handle: &mut Self::Handle);

    fn set_position(&mut self, handle: &mut Self::Handle, position: Vec3);

    /// False once the backing object has been destroyed behind our back.
    fn is_alive(&self, _handle: &Self::Handle) -> bool {
        true
    }
}
