//! Classes, instances, inheritance, `super()`, and host classes mixed into
//! script inheritance chains.

use scriptling::{ClassBuilder, ExcType, Interpreter, Object};

fn eval(source: &str) -> Object {
    Interpreter::new().eval(source).unwrap()
}

#[test]
fn class_with_inheritance() {
    let mut interp = Interpreter::new();
    interp
        .eval(
            r#"
class Animal:
    def __init__(self,n): self.name=n
    def speak(self): return self.name+" makes a sound"
class Dog(Animal):
    def bark(self): return self.name+" says Woof!"
d = Dog("Buddy"); s = d.speak(); b = d.bark()
"#,
        )
        .unwrap();
    assert_eq!(interp.get_var_as_string("s").unwrap(), "Buddy makes a sound");
    assert_eq!(interp.get_var_as_string("b").unwrap(), "Buddy says Woof!");
}

#[test]
fn inherited_method_dispatches_to_base() {
    let script = r"
class Base:
    def hello(self):
        return 'base'
class Child(Base):
    pass
Child().hello()
";
    assert_eq!(eval(script), Object::str("base"));
}

#[test]
fn override_shadows_base_method() {
    let script = r"
class Base:
    def hello(self):
        return 'base'
class Child(Base):
    def hello(self):
        return 'child'
Child().hello()
";
    assert_eq!(eval(script), Object::str("child"));
}

#[test]
fn super_dispatches_to_immediate_base() {
    let script = r"
class Shape:
    def describe(self):
        return 'shape'
class Circle(Shape):
    def describe(self):
        return super().describe() + '/circle'
Circle().describe()
";
    assert_eq!(eval(script), Object::str("shape/circle"));
}

#[test]
fn super_in_init_chain() {
    let script = r"
class Base:
    def __init__(self, x):
        self.x = x
class Child(Base):
    def __init__(self, x):
        super().__init__(x * 2)
Child(21).x
";
    assert_eq!(eval(script), Object::Int(42));
}

#[test]
fn fields_are_per_instance() {
    let script = r"
class Box:
    def __init__(self, v):
        self.v = v
a = Box(1)
b = Box(2)
a.v + b.v
";
    assert_eq!(eval(script), Object::Int(3));
}

#[test]
fn attribute_assignment_outside_init() {
    let script = r"
class Bag:
    pass
b = Bag()
b.weight = 12
b.weight
";
    assert_eq!(eval(script), Object::Int(12));
}

#[test]
fn missing_attribute_errors() {
    let exc = Interpreter::new()
        .eval("class Empty:\n    pass\nEmpty().nope")
        .unwrap_err();
    assert_eq!(exc.exc_type(), Some(ExcType::AttributeError));
}

#[test]
fn isinstance_walks_class_chain() {
    let script = r"
class Animal:
    pass
class Dog(Animal):
    pass
d = Dog()
[isinstance(d, Dog), isinstance(d, Animal), isinstance(d, 'Animal')]
";
    assert_eq!(eval(script), eval("[True, True, True]"));
}

#[test]
fn methods_as_values_stay_bound() {
    let script = r"
class Greeter:
    def __init__(self, name):
        self.name = name
    def hello(self):
        return 'hi ' + self.name
g = Greeter('ada')
m = g.hello
m()
";
    assert_eq!(eval(script), Object::str("hi ada"));
}

#[test]
fn iteration_protocol_on_instances() {
    let script = r"
class UpTo:
    def __init__(self, n):
        self.n = n
        self.i = 0
    def __iter__(self):
        return self
    def __next__(self):
        if self.i >= self.n:
            raise StopIteration('done')
        self.i = self.i + 1
        return self.i
total = 0
for v in UpTo(4):
    total = total + v
total
";
    assert_eq!(eval(script), Object::Int(10));
}

// === Host classes ===

fn counter_class() -> ClassBuilder {
    ClassBuilder::new("Counter")
        .doc("a counting helper")
        .method("add", |this: Object, by: i64| {
            let Object::Instance(instance) = &this else {
                return 0;
            };
            let current = match instance.borrow().get_field("total") {
                Some(Object::Int(n)) => *n,
                _ => 0,
            };
            let updated = current + by;
            instance.borrow_mut().set_field("total", Object::Int(updated));
            updated
        })
        .method("total", |this: Object| {
            let Object::Instance(instance) = &this else {
                return 0;
            };
            match instance.borrow().get_field("total") {
                Some(Object::Int(n)) => *n,
                _ => 0,
            }
        })
}

#[test]
fn host_class_usable_from_script() {
    let mut interp = Interpreter::new();
    interp.register_class(counter_class());
    let r = interp
        .eval("c = Counter()\nc.add(40)\nc.add(2)\nc.total()")
        .unwrap();
    assert_eq!(r, Object::Int(42));
}

#[test]
fn script_class_extends_host_class() {
    let mut interp = Interpreter::new();
    interp.register_class(counter_class());
    let r = interp
        .eval(
            r"
class Doubler(Counter):
    def add_twice(self, by):
        self.add(by)
        self.add(by)
d = Doubler()
d.add_twice(21)
d.total()
",
        )
        .unwrap();
    assert_eq!(r, Object::Int(42));
}

#[test]
fn host_class_extends_script_class() {
    let mut interp = Interpreter::new();
    interp
        .eval(
            r"
class Named:
    def label(self):
        return 'named'
",
        )
        .unwrap();
    let base = interp.get_var("Named").unwrap();
    let builder = ClassBuilder::new("Tagged")
        .base_class(&base)
        .unwrap()
        .method("tag", |_this: Object| "tagged".to_owned());
    interp.register_class(builder);
    let r = interp.eval("t = Tagged()\nt.label() + '/' + t.tag()").unwrap();
    assert_eq!(r, Object::str("named/tagged"));
}

// === Host-initiated construction and method calls ===

#[test]
fn create_instance_runs_init() {
    let mut interp = Interpreter::new();
    interp
        .eval(
            r"
class Point:
    def __init__(self, x, y):
        self.x = x
        self.y = y
    def dist2(self):
        return self.x * self.x + self.y * self.y
",
        )
        .unwrap();
    let p = interp
        .create_instance("Point", vec![Object::Int(3), Object::Int(4)])
        .unwrap();
    let d = interp.call_method(&p, "dist2", vec![]).unwrap();
    assert_eq!(d, Object::Int(25));
}

#[test]
fn create_instance_on_host_class() {
    let mut interp = Interpreter::new();
    interp.register_class(counter_class());
    let c = interp.create_instance("Counter", vec![]).unwrap();
    interp.call_method(&c, "add", vec![Object::Int(7)]).unwrap();
    let total = interp.call_method(&c, "total", vec![]).unwrap();
    assert_eq!(total, Object::Int(7));
}
