//! C runtime preamble
//!
//! Every generated translation unit starts with [`PREAMBLE`]. It provides:
//!
//! - a scoped heap: blocks allocated through `__rt_alloc` are chained on a
//!   list and finalized together when the outermost `__rt_heap_release`
//!   runs,
//! - growable arrays (`__rt_array`) with bounds-checked accessors generated
//!   per element kind by `__RT_ARRAY_PRIMITIVES`,
//! - `_Generic` dispatch for printing (`__RT_PRINT`) and equality
//!   (`__RT_EQ`),
//! - `__RT_BREAKPOINT`, which traps only when `RT_DEBUG` is defined.
//!
//! The preamble only calls C library functions listed in
//! [`RESERVED_SYMBOLS`](super::constants::RESERVED_SYMBOLS).

pub const PREAMBLE: &str = r#"#include <stdbool.h>
#include <stddef.h>
#include <stdint.h>
#include <stdio.h>
#include <stdlib.h>
#include <string.h>
#include <signal.h>

typedef struct __rt_block {
    struct __rt_block *next;
    void (*finalize)(void *);
} __rt_block;

static __rt_block *__rt_blocks = NULL;
static int __rt_heap_depth = 0;

static inline void __rt_fail(const char *message) {
    printf("cinder: %s\n", message);
    exit(1);
}

static inline void *__rt_alloc(size_t size, void (*finalize)(void *)) {
    __rt_block *block = calloc(1, sizeof(__rt_block) + size);
    if (!block) __rt_fail("out of memory");
    block->next = __rt_blocks;
    block->finalize = finalize;
    __rt_blocks = block;
    return block + 1;
}

static inline void __rt_heap_acquire(void) {
    __rt_heap_depth++;
}

static inline void __rt_heap_release(void) {
    if (__rt_heap_depth == 0) return;
    if (--__rt_heap_depth > 0) return;
    while (__rt_blocks) {
        __rt_block *block = __rt_blocks;
        __rt_blocks = block->next;
        if (block->finalize) block->finalize(block + 1);
        free(block);
    }
}

typedef struct __rt_array {
    int64_t len;
    int64_t cap;
    size_t elem_size;
    void *data;
} __rt_array;

static inline void __rt_array_finalize(void *p) {
    free(((__rt_array *)p)->data);
}

static inline __rt_array *__rt_array_new(size_t elem_size) {
    __rt_array *a = __rt_alloc(sizeof(__rt_array), __rt_array_finalize);
    a->elem_size = elem_size;
    return a;
}

static inline void __rt_array_reserve(__rt_array *a, int64_t want) {
    if (want <= a->cap) return;
    int64_t cap = a->cap ? a->cap * 2 : 8;
    while (cap < want) cap *= 2;
    void *data = realloc(a->data, (size_t)cap * a->elem_size);
    if (!data) __rt_fail("out of memory");
    a->data = data;
    a->cap = cap;
}

static inline void __rt_array_check(__rt_array *a, int64_t i) {
    if (!a) __rt_fail("use of a null array");
    if (i < 0 || i >= a->len) {
        printf("cinder: array index %lld out of bounds (size %lld)\n",
               (long long)i, (long long)a->len);
        exit(1);
    }
}

static inline int64_t __rt_array_size(__rt_array *a) {
    return a ? a->len : 0;
}

#define __RT_ARRAY_PRIMITIVES(T, NAME)                                        \
    static inline __rt_array *__rt_array_create_##NAME(void) {                \
        return __rt_array_new(sizeof(T));                                     \
    }                                                                         \
    static inline void __rt_array_push_##NAME(__rt_array *a, T v) {           \
        if (!a) __rt_fail("use of a null array");                             \
        __rt_array_reserve(a, a->len + 1);                                    \
        ((T *)a->data)[a->len++] = v;                                         \
    }                                                                         \
    static inline T __rt_array_get_##NAME(__rt_array *a, int64_t i) {         \
        __rt_array_check(a, i);                                               \
        return ((T *)a->data)[i];                                             \
    }                                                                         \
    static inline void __rt_array_set_##NAME(__rt_array *a, int64_t i, T v) { \
        __rt_array_check(a, i);                                               \
        ((T *)a->data)[i] = v;                                                \
    }

__RT_ARRAY_PRIMITIVES(int64_t, num)
__RT_ARRAY_PRIMITIVES(double, rnum)
__RT_ARRAY_PRIMITIVES(bool, bool)
__RT_ARRAY_PRIMITIVES(char *, str)

static inline int64_t __rt_str_len(const char *s) {
    return s ? (int64_t)strlen(s) : 0;
}

static inline bool __rt_str_eq(const char *a, const char *b) {
    if (a == b) return true;
    if (!a || !b) return false;
    return strcmp(a, b) == 0;
}

static inline bool __rt_ptr_eq(const void *a, const void *b) {
    return a == b;
}

static inline bool __rt_int_eq(int64_t a, int64_t b) {
    return a == b;
}

static inline bool __rt_real_eq(double a, double b) {
    return a == b;
}

#define __RT_EQ(a, b) _Generic((a),   \
    char *: __rt_str_eq,              \
    const char *: __rt_str_eq,        \
    double: __rt_real_eq,             \
    int64_t *: __rt_ptr_eq,           \
    double *: __rt_ptr_eq,            \
    bool *: __rt_ptr_eq,              \
    char **: __rt_ptr_eq,             \
    __rt_array *: __rt_ptr_eq,        \
    default: __rt_int_eq)((a), (b))

static inline void __rt_print_int(int64_t v) { printf("%lld", (long long)v); }
static inline void __rt_print_real(double v) { printf("%g", v); }
static inline void __rt_print_bool(bool v) { printf("%s", v ? "true" : "false"); }
static inline void __rt_print_char(char v) { putchar(v); }
static inline void __rt_print_str(const char *v) { printf("%s", v ? v : "(null)"); }
static inline void __rt_print_ptr(const void *v) { printf("%p", v); }

#define __RT_PRINT(x) _Generic((x),   \
    char *: __rt_print_str,           \
    const char *: __rt_print_str,     \
    double: __rt_print_real,          \
    bool: __rt_print_bool,            \
    char: __rt_print_char,            \
    int64_t *: __rt_print_ptr,        \
    double *: __rt_print_ptr,         \
    bool *: __rt_print_ptr,           \
    char **: __rt_print_ptr,          \
    __rt_array *: __rt_print_ptr,     \
    default: __rt_print_int)(x)

#if defined(RT_DEBUG) && defined(SIGTRAP)
#define __RT_BREAKPOINT(line, column)                                  \
    do {                                                               \
        printf("cinder: breakpoint at %d:%d\n", (line), (column));     \
        raise(SIGTRAP);                                                \
    } while (0)
#else
#define __RT_BREAKPOINT(line, column) ((void)0)
#endif

"#;
