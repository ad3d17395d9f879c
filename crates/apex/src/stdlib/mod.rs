//! Native-library registry: built-in libraries plus optionally `dlopen`-loaded ones.
//!
//! Grounded in `original_source/apexLib.h`/`apexLib.c`: a two-level
//! `(libname, fnname)` table that both the interpreter's own built-in
//! libraries and a dynamically loaded shared object populate, and
//! `apexVM.c`'s `vm_calllib`, which looks functions up by name at call time
//! rather than by a pointer baked into the bytecode. `CALL_LIB` and a plain
//! `CALL` of a `CFn` value both end up here (spec.md §3's supplemented
//! native-library section: "the dynamic-loading path and the built-in path
//! are exercised by the same dispatcher").

mod array_lib;
mod crypt_lib;
mod io_lib;
mod math_lib;
mod os_lib;
mod str_lib;

use ahash::AHashMap;

use crate::bytecode::vm::Vm;
use crate::error::RuntimeError;
use crate::intern::StringId;

/// A built-in native function: reads its `argc` arguments off `vm`'s stack
/// and pushes exactly one result, the same contract `CALL`/`CALL_MEMBER`
/// expect from an Apex-defined function's `RETURN` (spec.md §4.3).
pub type BuiltinFn = fn(&mut Vm, usize) -> Result<(), RuntimeError>;

/// The raw ABI a dynamically loaded (`dlopen`ed) library function must
/// expose: a fixed-arity numeric call taking up to `argc` doubles and
/// writing one result through `out`, returning 0 on success and any other
/// value as an error code. Real Apex native libraries operate on the full
/// dynamically-typed `Value`, but marshalling an arbitrary `Value` across a
/// C ABI boundary safely needs a stable representation this crate does not
/// otherwise define; this numeric subset is exercised by `os_lib`/`math_lib`-
/// shaped plugins (the kind spec.md §3 calls out: "numeric abs/sqrt/pow").
///
/// # Safety
/// The caller must ensure `args` points to `argc` valid, initialized `f64`s
/// and `out` points to one writable `f64` for the duration of the call.
pub type RawNumericFn = unsafe extern "C" fn(args: *const f64, argc: usize, out: *mut f64) -> i32;

/// A loaded shared object exports this symbol naming the functions it wants
/// registered under its library name, since `libloading` has no portable way
/// to enumerate a library's exported symbols.
const MANIFEST_SYMBOL: &[u8] = b"apex_native_functions\0";

type Manifest = unsafe extern "C" fn() -> *const NativeEntry;

/// One `(name, function pointer)` pair in a plugin's null-terminated manifest.
#[repr(C)]
struct NativeEntry {
    name: *const std::os::raw::c_char,
    func: Option<RawNumericFn>,
}

/// Resolves `(libname, fnname)` calls to either a built-in Rust function or a
/// function exported by a `dlopen`ed shared object, per `CALL_LIB`/`CALL`.
#[derive(Default)]
pub struct Registry {
    builtins: AHashMap<&'static str, AHashMap<&'static str, BuiltinFn>>,
    dynamic: AHashMap<(String, String), RawNumericFn>,
    /// Keeps every loaded library mapped for the registry's lifetime; a
    /// `Library` must outlive any `Symbol` taken from it (`libloading`'s own
    /// safety contract), so these are never dropped before the VM is.
    loaded: Vec<libloading::Library>,
}

impl Registry {
    /// Registers every built-in library (spec.md §3's supplemented-features
    /// list: str/math/array/os/io/crypt) with no dynamic libraries loaded.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::default();
        registry.add_lib("str", str_lib::FUNCTIONS);
        registry.add_lib("math", math_lib::FUNCTIONS);
        registry.add_lib("array", array_lib::FUNCTIONS);
        registry.add_lib("os", os_lib::FUNCTIONS);
        registry.add_lib("io", io_lib::FUNCTIONS);
        registry.add_lib("crypt", crypt_lib::FUNCTIONS);
        registry
    }

    fn add_lib(&mut self, name: &'static str, functions: &[(&'static str, BuiltinFn)]) {
        let table = self.builtins.entry(name).or_default();
        for (fn_name, func) in functions {
            table.insert(fn_name, *func);
        }
    }

    /// Scans `search_path` for shared objects (`.so`/`.dylib`/`.dll`, per the
    /// host platform's `libloading` conventions) and loads any that export
    /// `MANIFEST_SYMBOL`, registering their functions under `lib_name`.
    /// Mirrors `original_source/apexLib.c`'s `apexLib_loaddir`, which walks a
    /// directory and calls each shared object's `apex_register_<lib>` entry
    /// point; this loader uses one manifest symbol per library instead of a
    /// per-function naming convention, since Rust has no `dlsym`-by-prefix
    /// enumeration helper the way the original's build-time macro expansion
    /// does.
    ///
    /// # Safety
    /// Loading an arbitrary shared object and calling into it is inherently
    /// unsafe: the caller is trusting `search_path`'s contents to honor this
    /// module's manifest ABI.
    pub unsafe fn load_dynamic_lib(&mut self, lib_name: &str, path: &std::path::Path) -> Result<(), libloading::Error> {
        unsafe {
            let library = libloading::Library::new(path)?;
            let manifest: libloading::Symbol<Manifest> = library.get(MANIFEST_SYMBOL)?;
            let mut entry = manifest();
            while !(*entry).name.is_null() {
                let name = std::ffi::CStr::from_ptr((*entry).name).to_string_lossy().into_owned();
                if let Some(func) = (*entry).func {
                    self.dynamic.insert((lib_name.to_owned(), name), func);
                }
                entry = entry.add(1);
            }
            self.loaded.push(library);
        }
        Ok(())
    }

    /// Loads every shared object found in the `APEX_PATH`-separated
    /// directory list (spec.md §6's dynamic-loading note), skipping
    /// directories that don't exist and libraries that fail to load a
    /// manifest (a malformed plugin should not take the whole program down).
    pub fn load_from_env(&mut self) {
        let Ok(search_path) = std::env::var("APEX_PATH") else {
            return;
        };
        for dir in std::env::split_paths(&search_path) {
            let Ok(read_dir) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in read_dir.flatten() {
                let path = entry.path();
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let lib_name = stem.strip_prefix("lib").unwrap_or(stem);
                // SAFETY: `load_dynamic_lib` trusts `APEX_PATH` contents;
                // an operator controls that environment variable.
                if let Err(err) = unsafe { self.load_dynamic_lib(lib_name, &path) } {
                    eprintln!("warning: failed to load native library '{lib_name}' from {}: {err}", path.display());
                }
            }
        }
    }

    /// Resolves and calls `lib.fn_name(argc args popped off vm's stack)`.
    pub fn call(&self, vm: &mut Vm, lib: StringId, fn_name: StringId, argc: usize) -> Result<(), RuntimeError> {
        let lib_name = vm.interner().resolve(lib).to_owned();
        let fn_name_str = vm.interner().resolve(fn_name).to_owned();

        if let Some(func) = self.builtins.get(lib_name.as_str()).and_then(|t| t.get(fn_name_str.as_str())) {
            return func(vm, argc);
        }

        if let Some(raw) = self.dynamic.get(&(lib_name.clone(), fn_name_str.clone())) {
            return call_raw_numeric(vm, *raw, argc);
        }

        Err(vm.native_error(format!("no such native function '{lib_name}:{fn_name_str}'")))
    }
}

/// Bridges a `RawNumericFn` plugin into the `Value`-based calling convention:
/// pops `argc` numeric arguments, calls the plugin, and pushes its result as
/// a `Dbl`.
fn call_raw_numeric(vm: &mut Vm, func: RawNumericFn, argc: usize) -> Result<(), RuntimeError> {
    let args = vm.pop_native_args(argc)?;
    let mut numeric = Vec::with_capacity(argc);
    for arg in &args {
        numeric.push(as_f64(*arg, vm)?);
    }
    let mut out = 0.0_f64;
    // SAFETY: `numeric` has exactly `argc` initialized elements and `out` is
    // a valid `f64` slot for the duration of this call, satisfying
    // `RawNumericFn`'s contract.
    let status = unsafe { func(numeric.as_ptr(), numeric.len(), &mut out) };
    if status != 0 {
        return Err(vm.native_error(format!("native function returned error code {status}")));
    }
    vm.push_result(crate::value::Value::Dbl(out))
}

fn as_f64(value: crate::value::Value, vm: &Vm) -> Result<f64, RuntimeError> {
    use crate::value::Value;
    match value {
        Value::Int(i) => Ok(i as f64),
        Value::Flt(f) => Ok(f64::from(f)),
        Value::Dbl(d) => Ok(d),
        other => Err(vm.native_error(format!("native function expects a numeric argument, found {}", other.type_name()))),
    }
}

#[cfg(test)]
mod tests {
    use super::Registry;

    #[test]
    fn builtins_cover_every_library() {
        let registry = Registry::with_builtins();
        for lib in ["str", "math", "array", "os", "io", "crypt"] {
            assert!(registry.builtins.contains_key(lib), "missing built-in library '{lib}'");
        }
    }
}
