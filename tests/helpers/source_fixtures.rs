//! Common C++ sources for tests.

pub const FOO_HEADER: &str = "\
class Foo
{
public:
    void bar();
    int count(int from, int to) const;
};
";

pub const FOO_SOURCE: &str = "\
#include \"foo.h\"

void Foo::bar()
{
    int unused = 0;
    int used = 1;
    used += count(used, 2);
}

int Foo::count(int from, int to) const
{
    return to - from;
}
";

pub const SIBLING_CLASSES: &str = "\
class Reader
{
public:
    void run();
};

class Writer
{
public:
    void run();
};

void Reader::run() {}
void Writer::run() {}

void drive(Writer &writer)
{
    writer.run();
}
";

pub const MACRO_HEADER: &str = "\
#define FOO 1
#define TWICE(x) ((x) + (x))
";

pub const MACRO_SOURCE: &str = "\
#include \"macros.h\"

int value = FOO;
int doubled = TWICE(value);
";
