use super::EntryFn;
use core::arch::global_asm;

/// Callee-saved state of AAPCS64: x19-x30, sp and the low halves of v8-v15.
#[derive(Debug, Default, Clone, Copy)]
#[repr(C)]
pub struct SavedContext {
    x19_x30: [u64; 12],
    sp: u64,
    d8_d15: [u64; 8],
}

extern "C" {
    #[link_name = asm_symbol!("switch_context")]
    fn cothread_switch_context(from: *mut SavedContext, to: *const SavedContext);
    #[link_name = asm_symbol!("bootstrap")]
    fn cothread_bootstrap();
}

// x0 = from, x1 = to. Returns through the restored x30.
global_asm!(
    ".text",
    ".p2align 4",
    concat!(".global ", asm_symbol!("switch_context")),
    concat!(".hidden ", asm_symbol!("switch_context")),
    concat!(asm_symbol!("switch_context"), ":"),
    "mov x9, sp",
    "stp x19, x20, [x0, #0x00]",
    "stp x21, x22, [x0, #0x10]",
    "stp x23, x24, [x0, #0x20]",
    "stp x25, x26, [x0, #0x30]",
    "stp x27, x28, [x0, #0x40]",
    "stp x29, x30, [x0, #0x50]",
    "str x9, [x0, #0x60]",
    "stp d8, d9, [x0, #0x68]",
    "stp d10, d11, [x0, #0x78]",
    "stp d12, d13, [x0, #0x88]",
    "stp d14, d15, [x0, #0x98]",
    "ldp x19, x20, [x1, #0x00]",
    "ldp x21, x22, [x1, #0x10]",
    "ldp x23, x24, [x1, #0x20]",
    "ldp x25, x26, [x1, #0x30]",
    "ldp x27, x28, [x1, #0x40]",
    "ldp x29, x30, [x1, #0x50]",
    "ldr x9, [x1, #0x60]",
    "ldp d8, d9, [x1, #0x68]",
    "ldp d10, d11, [x1, #0x78]",
    "ldp d12, d13, [x1, #0x88]",
    "ldp d14, d15, [x1, #0x98]",
    "mov sp, x9",
    "ret",
    "",
    // First activation of a prepared context: x19 = arg, x20 = entry.
    ".p2align 4",
    concat!(".global ", asm_symbol!("bootstrap")),
    concat!(".hidden ", asm_symbol!("bootstrap")),
    concat!(asm_symbol!("bootstrap"), ":"),
    "mov x0, x19",
    "mov x30, xzr",
    "br x20",
);

pub(super) unsafe fn prepare(stack_top: *mut u8, entry: EntryFn, arg: usize) -> SavedContext {
    let mut context = SavedContext {
        sp: stack_top as u64,
        ..Default::default()
    };
    context.x19_x30[0] = arg as u64;
    context.x19_x30[1] = entry as usize as u64;
    context.x19_x30[11] = cothread_bootstrap as unsafe extern "C" fn() as usize as u64;
    context
}

#[inline]
pub(super) unsafe fn switch(from: *mut SavedContext, to: *const SavedContext) {
    cothread_switch_context(from, to)
}
