use super::EntryFn;
use core::arch::global_asm;

const DEFAULT_MXCSR: u32 = 0x1F80;
const DEFAULT_FPU_CW: u32 = 0x037F;

/// Callee-saved state of the System V x86_64 ABI.
#[derive(Debug, Default, Clone, Copy)]
#[repr(C)]
pub struct SavedContext {
    rsp: u64,
    r15: u64,
    r14: u64,
    r13: u64,
    r12: u64,
    rbx: u64,
    rbp: u64,
    mxcsr: u32,
    fpu_cw: u32,
}

extern "C" {
    #[link_name = asm_symbol!("switch_context")]
    fn cothread_switch_context(from: *mut SavedContext, to: *const SavedContext);
    #[link_name = asm_symbol!("bootstrap")]
    fn cothread_bootstrap();
}

// rdi = from, rsi = to. The return address pushed by the call stays on the
// old stack; `ret` pops the one waiting on the new stack.
global_asm!(
    ".text",
    ".p2align 4",
    concat!(".global ", asm_symbol!("switch_context")),
    concat!(".hidden ", asm_symbol!("switch_context")),
    concat!(asm_symbol!("switch_context"), ":"),
    "mov [rdi + 0x00], rsp",
    "mov [rdi + 0x08], r15",
    "mov [rdi + 0x10], r14",
    "mov [rdi + 0x18], r13",
    "mov [rdi + 0x20], r12",
    "mov [rdi + 0x28], rbx",
    "mov [rdi + 0x30], rbp",
    "stmxcsr dword ptr [rdi + 0x38]",
    "fnstcw word ptr [rdi + 0x3c]",
    "mov rsp, [rsi + 0x00]",
    "mov r15, [rsi + 0x08]",
    "mov r14, [rsi + 0x10]",
    "mov r13, [rsi + 0x18]",
    "mov r12, [rsi + 0x20]",
    "mov rbx, [rsi + 0x28]",
    "mov rbp, [rsi + 0x30]",
    "ldmxcsr dword ptr [rsi + 0x38]",
    "fldcw word ptr [rsi + 0x3c]",
    "ret",
    "",
    // First activation of a prepared context: rbx = arg, r12 = entry.
    ".p2align 4",
    concat!(".global ", asm_symbol!("bootstrap")),
    concat!(".hidden ", asm_symbol!("bootstrap")),
    concat!(asm_symbol!("bootstrap"), ":"),
    "mov rdi, rbx",
    "jmp r12",
);

pub(super) unsafe fn prepare(stack_top: *mut u8, entry: EntryFn, arg: usize) -> SavedContext {
    // `ret` in the switch pops the bootstrap address, leaving rsp at
    // top - 8: the alignment a called function expects. The word above it
    // is a null return address that ends unwinding.
    let sp = (stack_top as usize - 16) as *mut u64;
    let bootstrap = cothread_bootstrap as unsafe extern "C" fn() as usize;
    sp.write(bootstrap as u64);
    sp.add(1).write(0);

    SavedContext {
        rsp: sp as u64,
        rbx: arg as u64,
        r12: entry as usize as u64,
        mxcsr: DEFAULT_MXCSR,
        fpu_cw: DEFAULT_FPU_CW,
        ..Default::default()
    }
}

#[inline]
pub(super) unsafe fn switch(from: *mut SavedContext, to: *const SavedContext) {
    cothread_switch_context(from, to)
}
