// Constants for the C code generator

/// Prefix of the per-loop iteration counters (`__loop_0`, `__loop_1`, ...)
pub const LOOP_COUNTER_PREFIX: &str = "__loop_";

/// Prefix of the temporaries holding `main`'s return value
pub const RETURN_TEMP_PREFIX: &str = "__ret_";

/// One indentation level of emitted C
pub const INDENT: &str = "    ";

/// Name of the entry point function
pub const ENTRY_POINT: &str = "main";

/// Function names user code may not define: the language intrinsics plus the
/// C library functions the runtime preamble calls.
pub const RESERVED_SYMBOLS: &[&str] = &[
    "print", "println", "push", "get", "set", "size", "len", "offset", "create", "printf",
    "puts", "putchar", "malloc", "calloc", "realloc", "free", "exit", "abort", "memcmp",
    "memcpy", "strcmp", "strlen", "raise",
];
