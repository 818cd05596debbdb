// ABOUTME: Version constants and REPL banner text

pub const VERSION: &str = "1.0.0";
pub const WELCOME_MESSAGE: &str = "ToyScript Interpreter v1.0";
pub const WELCOME_SUBTITLE: &str = "A small imperative scripting language in Rust";

pub const PROMPT: &str = "> ";
pub const INPUT_PROMPT: &str = "input> ";

pub const SUPPORTED_OPERATIONS: &str = r#"Supported operations:
  Arithmetic:   + - * / ^ %
  Logical:      and or not
  Comparison:   == != < > <= >=
  Control:      if (c) { } else { }, for (init; cond; update) { }, while (c) { }
  Functions:    def name(a, b) { return a + b; }
  Structs:      struct Obj { x, y }; o = Obj(3, 4); o.x
  Classes:      class Person { name; def greet() { print('Hello'); } }
  Lambdas:      f = (x, y) -> x + y
  Arrays:       {1, 2, 3}
  Parallel:     parallel { print(1); }
  I/O:          print(expr), input()
  Memory:       null, delete(x)

Enter 'quit' or 'exit' to leave."#;
