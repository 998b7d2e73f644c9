use anyhow::{anyhow, bail, Context as _, Result};
use clap::Parser;
use log::info;
use std::fmt::Display;
use std::fs;
use std::rc::Rc;

use marklit::compiler::{compile_program, Config, EmitMode};
use marklit::dom::Representation;
use marklit::eval::{call_function, Evaluator, Scope, Value};
use marklit::runtime::{self, render_value};
use marklit::semantics::parse_program;
use marklit::translation::Translator;
use marklit::translators::JavaScript;

/// Compiles the markup literals of a template file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Template file to compile.
    #[arg(short, long)]
    template: String,

    /// Representation the compiled markup builds.
    #[arg(long, default_value_t = Representation::Raw)]
    target: Representation,

    /// How elements are emitted.
    #[arg(long, default_value_t = EmitMode::Optimizing)]
    mode: EmitMode,

    /// Name the generated code refers to the runtime support module by.
    #[arg(long, default_value = "_h")]
    prefix: String,

    /// Module path to import the runtime support module from.
    #[arg(long)]
    import: Option<String>,

    /// Write the generated source here instead of stdout.
    #[arg(short, long)]
    output: Option<String>,

    /// Run the compiled program and print the HTML of this binding.
    #[arg(long)]
    render: Option<String>,
}

/// Carries a library error over as its message.
fn fail<E: Display>(error: E) -> anyhow::Error {
    anyhow!("{}", error)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!("parsing file {}", args.template);
    let source = fs::read_to_string(&args.template)
        .with_context(|| format!("cannot read {}", args.template))?;
    let program = parse_program(&source).map_err(fail)?;

    let config = Config {
        target: args.target,
        mode: args.mode,
        prefix: Rc::from(args.prefix.as_str()),
        import: args.import.as_deref().map(Rc::from),
    };
    let compiled = compile_program(&program, &config).map_err(fail)?;
    let generated = JavaScript::translate(&compiled);
    match &args.output {
        Some(path) => {
            fs::write(path, &generated).with_context(|| format!("cannot write {}", path))?;
            info!("wrote {}", path);
        }
        None => print!("{}", generated),
    }

    if let Some(name) = &args.render {
        let scope = Scope::global();
        if config.import.is_none() {
            scope.define(&config.prefix, runtime::module());
        }
        let mut evaluator = Evaluator::new();
        if let Some(path) = &config.import {
            evaluator.register_module(path, runtime::module());
        }
        evaluator.run(&compiled, &scope).map_err(fail)?;
        let value = match scope.lookup(name).map_err(fail)? {
            function @ (Value::Function(_) | Value::Native(_)) => {
                call_function(&function, vec![]).map_err(fail)?
            }
            Value::Undefined => bail!("{} is undefined", name),
            value => value,
        };
        println!("{}", render_value(&value).map_err(fail)?);
    }
    Ok(())
}
