//! Compile-and-run oracle for printed units.
//!
//! An [`Oracle`] turns a qualified class name plus the full text of its
//! compilation unit into a [`CompiledClass`]; instances of that class can
//! then be invoked by method name. [`InterpreterOracle`] runs the supported
//! Java subset in memory, so round trips can be checked without a JVM.

mod errors;
mod interpreter;
mod value;

pub use errors::OracleError;
pub use interpreter::InterpreterOracle;
pub use value::{Object, Value};

/// Something that can compile Java source.
pub trait Oracle {
    fn compile(
        &self,
        qualified_name: &str,
        source: &str,
    ) -> Result<Box<dyn CompiledClass>, OracleError>;
}

/// A class that compiled successfully.
pub trait CompiledClass {
    fn qualified_name(&self) -> &str;

    /// Run static initializers and the no-arg constructor.
    fn instantiate(&self) -> Result<Box<dyn Instance>, OracleError>;
}

/// A live object of a compiled class.
pub trait Instance {
    /// Invoke `method` with `args`. Overloads are resolved by argument
    /// count and type.
    fn invoke(&mut self, method: &str, args: &[Value]) -> Result<Value, OracleError>;

    /// Current value of an instance field.
    fn field(&self, name: &str) -> Option<Value>;

    /// Drain what the instance printed to `System.out` so far.
    fn take_output(&mut self) -> String;
}

/// Compile `source`, instantiate `qualified_name` and invoke `method` once
/// without arguments. Returns the result and the captured output.
pub fn run_once(
    oracle: &dyn Oracle,
    qualified_name: &str,
    source: &str,
    method: &str,
) -> Result<(Value, String), OracleError> {
    let class = oracle.compile(qualified_name, source)?;
    let mut instance = class.instantiate()?;
    let result = instance.invoke(method, &[]);
    let output = instance.take_output();
    Ok((result?, output))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOO1: &str = r#"package transformation;

public class Foo1 implements IFoo {
    private int counter = 0;

    public int m() {
        return 3 + 2;
    }

    public final String foo() {
        System.out.println("This is a test");
        System.out.println("Line 2");
        return "foo has been called";
    }

    public int add(int value1, int value2) {
        try {
            return value1 + value2;
        } catch (RuntimeException ignored) {
            System.out.println("ignoring " + ignored.getMessage());
            throw ignored;
        } finally {
            counter++;
        }
    }
}

interface IFoo {
    int m();
}
"#;

    #[test]
    fn runs_the_fixture_class() {
        let class = InterpreterOracle.compile("transformation.Foo1", FOO1).unwrap();
        assert_eq!(class.qualified_name(), "transformation.Foo1");

        let mut foo = class.instantiate().unwrap();
        assert_eq!(foo.invoke("m", &[]).unwrap(), Value::Int(5));
        assert_eq!(foo.invoke("foo", &[]).unwrap(), Value::from("foo has been called"));
        assert_eq!(foo.take_output(), "This is a test\nLine 2\n");
        assert_eq!(foo.take_output(), "");

        let sum = foo.invoke("add", &[Value::Int(40), Value::Int(2)]).unwrap();
        assert_eq!(sum, Value::Int(42));
        assert_eq!(foo.field("counter"), Some(Value::Int(1)));
    }

    #[test]
    fn instances_do_not_share_state() {
        let class = InterpreterOracle.compile("transformation.Foo1", FOO1).unwrap();
        let mut first = class.instantiate().unwrap();
        let second = class.instantiate().unwrap();
        first.invoke("add", &[Value::Int(1), Value::Int(1)]).unwrap();
        assert_eq!(first.field("counter"), Some(Value::Int(1)));
        assert_eq!(second.field("counter"), Some(Value::Int(0)));
    }

    #[test]
    fn run_once_returns_output() {
        let (value, output) =
            run_once(&InterpreterOracle, "transformation.Foo1", FOO1, "foo").unwrap();
        assert_eq!(value.as_str(), Some("foo has been called"));
        assert!(output.starts_with("This is a test"));
    }

    #[test]
    fn interfaces_cannot_be_instantiated() {
        let class = InterpreterOracle.compile("transformation.IFoo", FOO1).unwrap();
        let err = class.instantiate().err().unwrap();
        assert!(matches!(err, OracleError::Runtime { ref exception, .. } if exception.ends_with("InstantiationException")));
    }
}
