//! The `crypt:` native library: a single hash function.
//!
//! Grounded in `original_source/lib/crypt.c`'s `crypt_hash` registration
//! (spec.md §3: "a couple of hash functions for crypt:"). `aes`/`aes_inv`
//! are left out: DESIGN.md already drops every cryptographic-hash/cipher
//! dependency this crate's examples pulled in (`sha1`/`sha2`/`md-5`/etc.),
//! so `hash` here is FNV-1a, a fast non-cryptographic hash, not a drop-in
//! replacement for the original's digest — good enough to exercise the
//! `(libname, fnname)` dispatch path, not a security primitive.

use crate::bytecode::vm::Vm;
use crate::error::RuntimeError;
use crate::value::Value;

use super::BuiltinFn;

pub const FUNCTIONS: &[(&str, BuiltinFn)] = &[("hash", hash)];

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn hash(vm: &mut Vm, argc: usize) -> Result<(), RuntimeError> {
    if argc != 1 {
        return Err(vm.native_error(format!("crypt:hash expects 1 argument(s) but got {argc}")));
    }
    let arg = vm.pop_arg()?;
    let Value::Str(id) = arg else {
        return Err(vm.native_error(format!("crypt:hash expects a string argument, found {}", arg.type_name())));
    };
    let digest = fnv1a(vm.interner().resolve(id).as_bytes());
    let hex = format!("{digest:016x}");
    let result = vm.interner_mut().intern(&hex);
    vm.push_result(Value::Str(result))
}
