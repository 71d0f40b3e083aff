use crate::machine::TAPE_LEN;
use crate::program;

/// Translate a program into an equivalent, self-contained C source file.
///
/// One pass, no jump map: `[`/`]` become a structured `while (*cell)` loop,
/// so an unbalanced source yields C that fails to compile rather than being
/// rejected here (run the jump resolver first if validation is wanted).
///
/// Known divergence from the interpreter: the generated program uses
/// `unsigned char` cells, so `-` on a zero cell wraps to 255 where the
/// interpreter saturates at 0.
pub fn emit(source: &[u8]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "#include <stdio.h>\n\
         #include <stdlib.h>\n\n\
         int main(int argc, char **argv)\n{{\n\
         \tunsigned char *cell = calloc({TAPE_LEN}, 1);\n\
         \tunsigned char *cells = cell;\n\
         \tif (!cell) {{\n\
         \t\tfprintf(stderr, \"Error allocating memory.\\n\");\n\
         \t\treturn 1;\n\
         \t}}\n\n"
    ));

    for &byte in source {
        match byte {
            program::RIGHT => out.push_str("\t\t++cell;\n"),
            program::LEFT => out.push_str("\t\t--cell;\n"),
            program::INC => out.push_str("\t\t++*cell;\n"),
            program::DEC => out.push_str("\t\t--*cell;\n"),
            program::WRITE => out.push_str("\t\tputchar(*cell);\n"),
            program::READ => out.push_str("\t\t*cell = getchar();\n"),
            program::OPEN => out.push_str("\twhile (*cell) {\n"),
            program::CLOSE => out.push_str("\t}\n"),
            _ => {}
        }
    }

    out.push_str("\n\tfree(cells);\n\treturn 0;\n}\n\n");
    out
}
