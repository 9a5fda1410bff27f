/*
 * Executable Loader Interface
 *
 * The loader builds and tears down the pieces of a process the kernel does
 * not manage itself: the memory image of the executable and the stack
 * backing the process. Both are opaque to the core; it only stores the
 * handles in the PCB and gives them back for release.
 */

use crate::hal::Context;

/// Opaque handle to a loaded memory image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHandle(pub usize);

/// Opaque handle to an allocated process stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackHandle(pub usize);

/// A successfully loaded executable: its image and its entry point.
#[derive(Debug, Clone, Copy)]
pub struct LoadedImage {
    pub handle: ImageHandle,
    pub entry: usize,
}

/// The executable-loader seam.
pub trait Loader: Send {
    /// Build the memory image for `path`. Returns `None` if the executable
    /// cannot be found or mapped.
    fn load_image(&mut self, path: &str) -> Option<LoadedImage>;

    /// Release a memory image.
    fn free_image(&mut self, image: ImageHandle);

    /// Allocate a stack of `size` bytes for a new process.
    fn alloc_stack(&mut self, size: usize) -> StackHandle;

    /// Release a process stack.
    fn free_stack(&mut self, stack: StackHandle);

    /// Initialize `ctx` so the process starts executing at `entry` on the
    /// given stack within the given image.
    fn init_context(
        &mut self,
        image: ImageHandle,
        stack: StackHandle,
        stack_size: usize,
        entry: usize,
        ctx: &mut Context,
    );
}
