use owo_colors::OwoColorize;

pub fn provide_hints(msg: &str) {
    // Control flow
    if msg.contains("Break statement placed outside") || msg.contains("Continue statement placed outside") {
        eprintln!("{}", "Help: 'break' and 'continue' only work inside loops, switch or with.".yellow());
        eprintln!("    {}", "Example: while ( running ) { if ( done ) break ; }".bright_black());
    } else if msg.contains("Case and default labels") {
        eprintln!("{}", "Help: 'case' and 'default' must sit directly inside a switch body.".yellow());
    } else if msg.contains("Found duplicate case statement") {
        eprintln!("{}", "Help: each case value may appear once per switch.".yellow());
    } else if msg.contains("Statements in switch statement") {
        eprintln!("{}", "Help: start the switch body with a 'case' or 'default' label.".yellow());
    }
    // Constant folding
    else if msg.contains("Division by zero") || msg.contains("Modulo by zero") {
        eprintln!("{}", "Help: the right operand is a constant zero.".yellow());
        eprintln!("    {}", "Check the divisor before the operation or use a variable.".bright_black());
    } else if msg.contains("Cannot convert non-number string") {
        eprintln!("{}", "Help: real() only accepts strings that spell a number.".yellow());
    }
    // Variables
    else if msg.contains("Attempt to set a read-only variable") {
        eprintln!("{}", "Help: this builtin can be read but not assigned.".yellow());
    } else if msg.contains("Redeclaration of builtin variable") {
        eprintln!("{}", "Help: pick a name that is not a builtin variable.".yellow());
    } else if msg.contains("Array index should not be negative") {
        eprintln!("{}", "Help: array indices start at 0.".yellow());
    } else if msg.contains("Accessor has incorrect number of arguments") {
        eprintln!("{}", "Help: grids take two indices; maps and lists take one.".yellow());
        eprintln!("    {}", "Example: g [# x , y ] = 1 ; m [? \"key\" ] = 2 ;".bright_black());
    }
    // Calls
    else if msg.contains("expects") && msg.contains("arguments") {
        eprintln!("{}", "Help: the function was called with the wrong number of arguments.".yellow());
    }
    // Syntax
    else if msg.contains("Expected") {
        eprintln!("{}", "Help: a required token is missing.".yellow());
        if msg.contains("')'") {
            eprintln!("    {}", "Check that parentheses are balanced.".bright_black());
        } else if msg.contains("']'") {
            eprintln!("    {}", "Check that brackets are balanced.".bright_black());
        }
    } else if msg.contains("Enums are not currently supported") {
        eprintln!("{}", "Help: replace the enum with constants or macros.".yellow());
    }
    // Input files
    else if msg.contains("unknown token") {
        eprintln!("{}", "Help: token files hold one GML token per whitespace-separated word.".yellow());
        eprintln!("    {}", "Example: x += 1 ;".bright_black());
    } else if msg.contains("unterminated string") {
        eprintln!("{}", "Help: every '\"' needs a matching closing '\"'.".yellow());
    } else if msg.contains("failed to read") {
        eprintln!("{}", "Help: check that the file exists and is readable.".yellow());
    } else if msg.contains("failed to write") {
        eprintln!("{}", "Help: check that the output directory exists and is writable.".yellow());
    } else if msg.contains("malformed") {
        eprintln!("{}", "Help: the JSON document does not have the expected shape.".yellow());
        eprintln!("    {}", "Use --format notation for whitespace-separated token files.".bright_black());
    }
}
