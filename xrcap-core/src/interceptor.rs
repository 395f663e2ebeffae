//! `xrGetInstanceProcAddr` interception.
//!
//! Four names resolve to the layer's own hooks; every other name is
//! forwarded, untouched, to the next resolver in the chain.

use std::ffi::{CStr, c_char};

use tracing::trace;

use crate::error::LayerError;
use crate::xr::{Instance, XrResult, pfn};

pub const CREATE_SESSION: &CStr = c"xrCreateSession";
pub const DESTROY_SESSION: &CStr = c"xrDestroySession";
pub const BEGIN_FRAME: &CStr = c"xrBeginFrame";
pub const END_FRAME: &CStr = c"xrEndFrame";

/// The layer's hook entry points, handed out in place of the runtime's.
#[derive(Debug, Clone, Copy)]
pub struct HookTable {
    pub create_session: pfn::CreateSession,
    pub destroy_session: pfn::DestroySession,
    pub begin_frame: pfn::BeginFrame,
    pub end_frame: pfn::EndFrame,
}

impl HookTable {
    /// The hook for `name`, if it is one of the four intercepted entry
    /// points. Matching is exact and case-sensitive.
    pub fn lookup(&self, name: &CStr) -> Option<pfn::VoidFunction> {
        // SAFETY: the loader casts the returned pointer back to the
        // signature belonging to `name`, which is the one stored here.
        unsafe {
            if name == CREATE_SESSION {
                Some(std::mem::transmute::<pfn::CreateSession, pfn::VoidFunction>(self.create_session))
            } else if name == DESTROY_SESSION {
                Some(std::mem::transmute::<pfn::DestroySession, pfn::VoidFunction>(self.destroy_session))
            } else if name == BEGIN_FRAME {
                Some(std::mem::transmute::<pfn::BeginFrame, pfn::VoidFunction>(self.begin_frame))
            } else if name == END_FRAME {
                Some(std::mem::transmute::<pfn::EndFrame, pfn::VoidFunction>(self.end_frame))
            } else {
                None
            }
        }
    }
}

/// Wraps the next `xrGetInstanceProcAddr` and substitutes the hooks.
#[derive(Debug, Clone, Copy)]
pub struct Interceptor {
    hooks: HookTable,
    next: Option<pfn::GetInstanceProcAddr>,
}

impl Interceptor {
    pub fn new(hooks: HookTable, next: Option<pfn::GetInstanceProcAddr>) -> Self {
        Self { hooks, next }
    }

    pub fn hooks(&self) -> &HookTable {
        &self.hooks
    }

    /// The captured next resolver.
    pub fn next(&self) -> Result<pfn::GetInstanceProcAddr, LayerError> {
        self.next.ok_or(LayerError::ResolverMissing)
    }

    /// Resolve `name` for `instance`.
    ///
    /// # Safety
    ///
    /// `name` must be null or a valid NUL-terminated string, and `function`
    /// null or valid for a write.
    pub unsafe fn get_instance_proc_addr(
        &self,
        instance: Instance,
        name: *const c_char,
        function: *mut Option<pfn::VoidFunction>,
    ) -> XrResult {
        let next = match self.next() {
            Ok(next) => next,
            Err(e) => return e.xr_result(),
        };
        if name.is_null() || function.is_null() {
            return LayerError::NullArgument("xrGetInstanceProcAddr name or function").xr_result();
        }

        let requested = unsafe { CStr::from_ptr(name) };
        if let Some(hook) = self.hooks.lookup(requested) {
            trace!("intercepting {}", requested.to_string_lossy());
            unsafe { *function = Some(hook) };
            return XrResult::SUCCESS;
        }

        unsafe { next(instance, name, function) }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::xr::{FrameBeginInfo, FrameEndInfo, Session, SessionCreateInfo};

    unsafe extern "system" fn hook_create(
        _: Instance,
        _: *const SessionCreateInfo,
        _: *mut Session,
    ) -> XrResult {
        XrResult::SUCCESS
    }
    unsafe extern "system" fn hook_destroy(_: Session) -> XrResult {
        XrResult::SUCCESS
    }
    unsafe extern "system" fn hook_begin(_: Session, _: *const FrameBeginInfo) -> XrResult {
        XrResult::SUCCESS
    }
    unsafe extern "system" fn hook_end(_: Session, _: *const FrameEndInfo) -> XrResult {
        XrResult::SUCCESS
    }
    unsafe extern "system" fn runtime_symbol() {}

    thread_local! {
        static FORWARDED: Cell<usize> = const { Cell::new(0) };
    }

    unsafe extern "system" fn next_resolver(
        _: Instance,
        _: *const c_char,
        function: *mut Option<pfn::VoidFunction>,
    ) -> XrResult {
        FORWARDED.with(|c| c.set(c.get() + 1));
        unsafe { *function = Some(runtime_symbol) };
        XrResult(42)
    }

    fn hooks() -> HookTable {
        HookTable {
            create_session: hook_create,
            destroy_session: hook_destroy,
            begin_frame: hook_begin,
            end_frame: hook_end,
        }
    }

    #[test]
    fn lookup_matches_exact_names_only() {
        let hooks = hooks();
        assert!(hooks.lookup(c"xrBeginFrame").is_some());
        assert!(hooks.lookup(c"xrEndFrame").is_some());
        assert!(hooks.lookup(c"xrbeginframe").is_none());
        assert!(hooks.lookup(c"xrBeginFrameX").is_none());
        assert!(hooks.lookup(c"xrWaitFrame").is_none());
    }

    #[test]
    fn hooked_names_never_reach_next_resolver() {
        let interceptor = Interceptor::new(hooks(), Some(next_resolver));
        FORWARDED.with(|c| c.set(0));
        for name in [CREATE_SESSION, DESTROY_SESSION, BEGIN_FRAME, END_FRAME] {
            let mut out = None;
            let result =
                unsafe { interceptor.get_instance_proc_addr(Instance::from_raw(1), name.as_ptr(), &mut out) };
            assert_eq!(result, XrResult::SUCCESS);
            assert!(out.is_some());
        }
        assert_eq!(FORWARDED.with(Cell::get), 0);
    }

    #[test]
    fn other_names_forward_verbatim() {
        let interceptor = Interceptor::new(hooks(), Some(next_resolver));
        FORWARDED.with(|c| c.set(0));
        let mut out = None;
        let result = unsafe {
            interceptor.get_instance_proc_addr(Instance::from_raw(1), c"xrWaitFrame".as_ptr(), &mut out)
        };
        assert_eq!(result, XrResult(42));
        assert_eq!(out.map(|f| f as usize), Some(runtime_symbol as usize));
        assert_eq!(FORWARDED.with(Cell::get), 1);
    }

    #[test]
    fn missing_resolver_is_invalid_handle() {
        let interceptor = Interceptor::new(hooks(), None);
        let mut out = None;
        let result = unsafe {
            interceptor.get_instance_proc_addr(Instance::from_raw(1), c"xrBeginFrame".as_ptr(), &mut out)
        };
        assert_eq!(result, XrResult::ERROR_HANDLE_INVALID);
        assert!(out.is_none());
    }

    #[test]
    fn null_arguments_fail_validation() {
        let interceptor = Interceptor::new(hooks(), Some(next_resolver));
        let result = unsafe {
            interceptor.get_instance_proc_addr(Instance::from_raw(1), std::ptr::null(), &mut None)
        };
        assert_eq!(result, XrResult::ERROR_VALIDATION_FAILURE);
    }
}
