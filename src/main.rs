use anyhow::Result;
use clap::Parser as ClapParser;
use rustyline::DefaultEditor;
use std::fs;
use std::rc::Rc;

use stone::diagnostics;
use stone::interpreter::environment::Environment;
use stone::interpreter::native_function::all_native_functions;
use stone::interpreter::Evaluator;
use stone::interpreter::value::Value;
use stone::lexer::Lexer;
use stone::parser::Parser;

#[derive(ClapParser)]
#[command(name = "stone")]
#[command(about = "The Stone programming language")]
struct Cli {
    /// Script file to run (omit for REPL)
    script: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let env = Environment::new();
    for (name, function) in all_native_functions() {
        env.put(name, function);
    }
    let evaluator = Evaluator::new();

    match cli.script {
        None => run_prompt(&evaluator, &env)?,
        Some(path) => run_file(&path, &evaluator, &env)?,
    }

    Ok(())
}

fn run_prompt(evaluator: &Evaluator, env: &Rc<Environment>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut buffer = String::new();

    let history_path = dirs::home_dir().map(|p| p.join(".stone_history"));
    if let Some(ref path) = history_path {
        let _ = rl.load_history(path);
    }

    loop {
        let prompt = if buffer.is_empty() { "> " } else { "| " };

        match rl.readline(prompt) {
            Ok(line) => {
                buffer.push_str(&line);
                buffer.push('\n');

                if is_complete(&buffer) {
                    if !buffer.trim().is_empty() {
                        let _ = rl.add_history_entry(buffer.trim());
                        run(&buffer, evaluator, env);
                    }
                    buffer.clear();
                }
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(rustyline::error::ReadlineError::Interrupted) => {
                buffer.clear();
                println!("^C");
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }
    }

    if let Some(ref path) = history_path {
        let _ = rl.save_history(path);
    }

    Ok(())
}

fn is_complete(code: &str) -> bool {
    let mut depth = 0;
    let mut in_string = false;
    let mut iter = code.chars().peekable();

    while let Some(c) = iter.next() {
        if in_string {
            if c == '"' {
                in_string = false;
            } else if c == '\n' {
                // Treat the string as ending at the line break; if it was
                // meant to continue, the lexer will report the error.
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '/' => {
                if iter.peek() == Some(&'/') {
                    while let Some(&next) = iter.peek() {
                        if next == '\n' {
                            break;
                        }
                        iter.next();
                    }
                }
            }
            '{' | '(' | '[' => depth += 1,
            '}' | ')' | ']' => depth -= 1,
            _ => {}
        }
    }

    depth <= 0 && !in_string
}

fn run_file(path: &str, evaluator: &Evaluator, env: &Rc<Environment>) -> Result<()> {
    let contents = fs::read_to_string(path)?;
    run(&contents, evaluator, env);
    Ok(())
}

fn run(source: &str, evaluator: &Evaluator, env: &Rc<Environment>) {
    let parser = Parser::new(Lexer::new(source));

    match parser.parse() {
        Ok(program) => match evaluator.evaluate(&program, env) {
            Ok(Value::Null) => {}
            Ok(value) => println!("=> {}", value),
            Err(e) => {
                let hint = diagnostics::suggest_hint(&e.message);
                eprint!(
                    "{}",
                    diagnostics::render(source, "evaluate", e.line, &e.message, hint.as_deref())
                );
            }
        },
        Err(e) => {
            let hint = diagnostics::suggest_hint(&e.message);
            eprint!(
                "{}",
                diagnostics::render(source, "parse", e.line, &e.message, hint.as_deref())
            );
        }
    }
}
