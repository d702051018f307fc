//! Invocation codegen.
//!
//! Given a resolved descriptor, its binding token and the already generated
//! argument units, [`generate_invocation`] emits the code for one call:
//!
//! ```text
//! ReturnNullOnNullArgument                ReceivesNullFlags
//!
//!     [PUSH_CONTEXT]                          [PUSH_CONTEXT]
//!     <arg 0>                                 <arg 0>
//!     JUMP_IF_TRUE null_0                     ...
//!     ...                                     <arg n-1>
//!     <arg n-1>                               INVOKE_NULLABLE token argc flags
//!     JUMP_IF_TRUE null_n-1
//!     INVOKE token argc flags
//!     PUSH_FALSE
//!     JUMP end
//! null_n-1:
//!     POP
//!     ...
//! null_0:
//!     POP
//!     [POP]                                  (context)
//!     PUSH_UNDEFINED
//!     PUSH_TRUE
//! end:
//! ```
//!
//! Every argument unit leaves a `(value, is_null)` pair. On the strict path
//! the null test consumes the flag, so a null argument reaches its cleanup
//! label with exactly the values pushed so far on the stack and the chain
//! below it pops them all.

use rowgen_core::{FunctionDescriptor, NullConvention};

use crate::binder::BindingToken;
use crate::bytecode::{CallFlags, CodeUnit, LabelAllocator, OpCode};
use crate::emit::CodeBuilder;

/// Emit the call of `descriptor` through `token`.
///
/// `arguments` holds one unit per SQL-visible argument, in order. The caller
/// has already checked the arity and that the argument count, context
/// included, fits in a byte.
pub fn generate_invocation(
    labels: &mut LabelAllocator,
    descriptor: &FunctionDescriptor,
    token: BindingToken,
    arguments: Vec<CodeUnit>,
) -> CodeUnit {
    let requires_context = descriptor.requires_context();
    let flags = if requires_context {
        CallFlags::CONTEXT
    } else {
        CallFlags::empty()
    };
    let argc = (arguments.len() + usize::from(requires_context)) as u8;

    let mut builder = CodeBuilder::new();
    if requires_context {
        builder.emit_push_context();
    }

    match descriptor.null_convention() {
        NullConvention::ReceivesNullFlags => {
            for argument in arguments {
                builder.append(argument);
            }
            builder.emit_invoke_nullable(token, argc, flags);
        }
        NullConvention::ReturnNullOnNullArgument if arguments.is_empty() => {
            builder.emit_invoke(token, argc, flags);
            builder.emit_bool(false);
        }
        NullConvention::ReturnNullOnNullArgument => {
            let null_labels: Vec<_> = arguments.iter().map(|_| labels.next_label()).collect();
            let end = labels.next_label();

            for (argument, &on_null) in arguments.into_iter().zip(&null_labels) {
                builder.append(argument);
                builder.emit_jump(OpCode::JumpIfTrue, on_null);
            }
            builder.emit_invoke(token, argc, flags);
            builder.emit_bool(false);
            builder.emit_jump(OpCode::Jump, end);

            // Falling through from null_i into null_i-1 pops one value each.
            for &on_null in null_labels.iter().rev() {
                builder.mark(on_null);
                builder.emit_pop();
            }
            if requires_context {
                builder.emit_pop();
            }
            builder.emit_null_pair();
            builder.mark(end);
        }
    }

    tracing::trace!(
        function = descriptor.name(),
        %token,
        argc,
        context = requires_context,
        "generated invocation"
    );
    builder.finish()
}
