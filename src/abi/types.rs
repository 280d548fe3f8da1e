// Shared between the host crate and route files. Route files pull it in with
// `include!(env!("DYNROUTE_ABI"));`, so this file must stay free of inner
// attributes, crate-relative paths and external crates.

/// Marker every exported handler descriptor starts with ("DYRT").
pub const DYNROUTE_ABI_MAGIC: u32 = 0x4459_5254;

/// Bumped whenever `RawContext` or `HandlerDescriptor` change layout.
pub const DYNROUTE_ABI_VERSION: u32 = 1;

/// Borrowed byte range handed across the library boundary.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct RawSlice {
    pub ptr: *const u8,
    pub len: usize,
}

impl RawSlice {
    pub const EMPTY: RawSlice = RawSlice {
        ptr: std::ptr::null(),
        len: 0,
    };

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            ptr: bytes.as_ptr(),
            len: bytes.len(),
        }
    }

    pub fn from_text(value: &str) -> Self {
        Self::from_bytes(value.as_bytes())
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    /// # Safety
    /// The pointed-to memory must outlive `'a`.
    pub unsafe fn as_bytes<'a>(self) -> &'a [u8] {
        if self.ptr.is_null() {
            return &[];
        }
        std::slice::from_raw_parts(self.ptr, self.len)
    }

    /// Invalid UTF-8 reads as an empty string.
    ///
    /// # Safety
    /// The pointed-to memory must outlive `'a`.
    pub unsafe fn as_str<'a>(self) -> &'a str {
        std::str::from_utf8(self.as_bytes()).unwrap_or("")
    }
}

/// Per-request context passed to every handler and middleware.
///
/// Request fields are read-only views owned by the host for the duration of
/// the call. Everything that mutates the response goes through the host
/// callbacks so the host keeps ownership of its buffers.
#[repr(C)]
pub struct RawContext {
    pub method: RawSlice,
    pub path: RawSlice,
    pub query: RawSlice,
    pub client_ip: RawSlice,
    pub body: RawSlice,
    pub host: *mut std::ffi::c_void,
    pub header: unsafe extern "C" fn(host: *mut std::ffi::c_void, name: RawSlice) -> RawSlice,
    pub param: unsafe extern "C" fn(host: *mut std::ffi::c_void, name: RawSlice) -> RawSlice,
    pub set_status: unsafe extern "C" fn(host: *mut std::ffi::c_void, status: u16),
    pub set_header:
        unsafe extern "C" fn(host: *mut std::ffi::c_void, name: RawSlice, value: RawSlice),
    pub write: unsafe extern "C" fn(host: *mut std::ffi::c_void, bytes: RawSlice),
    pub abort: unsafe extern "C" fn(host: *mut std::ffi::c_void),
}

impl RawContext {
    pub fn method(&self) -> &str {
        unsafe { self.method.as_str() }
    }

    pub fn path(&self) -> &str {
        unsafe { self.path.as_str() }
    }

    pub fn query(&self) -> &str {
        unsafe { self.query.as_str() }
    }

    pub fn client_ip(&self) -> &str {
        unsafe { self.client_ip.as_str() }
    }

    pub fn body(&self) -> &[u8] {
        unsafe { self.body.as_bytes() }
    }

    /// Request header lookup, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        let value = unsafe { (self.header)(self.host, RawSlice::from_text(name)) };
        if value.is_null() {
            None
        } else {
            Some(unsafe { value.as_str() })
        }
    }

    /// Captured path parameter, e.g. `id` for a route file named `{id}.rs`.
    pub fn param(&self, name: &str) -> Option<&str> {
        let value = unsafe { (self.param)(self.host, RawSlice::from_text(name)) };
        if value.is_null() {
            None
        } else {
            Some(unsafe { value.as_str() })
        }
    }

    pub fn set_status(&mut self, status: u16) {
        unsafe { (self.set_status)(self.host, status) }
    }

    pub fn set_header(&mut self, name: &str, value: &str) {
        unsafe { (self.set_header)(self.host, RawSlice::from_text(name), RawSlice::from_text(value)) }
    }

    pub fn write(&mut self, bytes: &[u8]) {
        unsafe { (self.write)(self.host, RawSlice::from_bytes(bytes)) }
    }

    /// Stops the middleware chain; the response built so far is sent as is.
    pub fn abort(&mut self) {
        unsafe { (self.abort)(self.host) }
    }
}

/// The single recognized handler shape.
pub type RawHandlerFn = extern "C" fn(ctx: &mut RawContext);

/// What a route file exports under a verb name.
#[repr(C)]
pub struct HandlerDescriptor {
    pub magic: u32,
    pub abi_version: u32,
    pub call: RawHandlerFn,
}

impl HandlerDescriptor {
    pub const fn new(call: RawHandlerFn) -> Self {
        Self {
            magic: DYNROUTE_ABI_MAGIC,
            abi_version: DYNROUTE_ABI_VERSION,
            call,
        }
    }
}

/// `export_handler!(GET => list_users);`
#[allow(unused_macros)]
macro_rules! export_handler {
    ($verb:ident => $call:path) => {
        #[no_mangle]
        pub static $verb: HandlerDescriptor = HandlerDescriptor::new($call);
    };
}
