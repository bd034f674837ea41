use std::any::Any;
use std::marker::PhantomData;
use std::str::FromStr;

use super::TypeAdapter;
use crate::context::InvocationContext;

/// Parses any [`FromStr`] type. Used for the integer and float types.
#[derive(Debug)]
pub struct FromStrAdapter<T>(PhantomData<fn() -> T>);

impl<T> FromStrAdapter<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for FromStrAdapter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TypeAdapter for FromStrAdapter<T>
where
    T: FromStr + Any + Send + Sync,
{
    type Output = T;

    fn parse(&self, raw: &str, _ctx: &InvocationContext) -> Option<T> {
        raw.parse().ok()
    }
}

/// `true` or `false`, any case.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanAdapter;

impl TypeAdapter for BooleanAdapter {
    type Output = bool;

    fn parse(&self, raw: &str, _ctx: &InvocationContext) -> Option<bool> {
        if raw.eq_ignore_ascii_case("true") {
            Some(true)
        } else if raw.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }
}

/// Exactly one character.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharAdapter;

impl TypeAdapter for CharAdapter {
    type Output = char;

    fn parse(&self, raw: &str, _ctx: &InvocationContext) -> Option<char> {
        let mut chars = raw.chars();
        let ch = chars.next()?;
        chars.next().is_none().then_some(ch)
    }
}

/// The token itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringAdapter;

impl TypeAdapter for StringAdapter {
    type Output = String;

    fn parse(&self, raw: &str, _ctx: &InvocationContext) -> Option<String> {
        Some(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::guild_context;

    #[test]
    fn test_numbers() {
        let ctx = guild_context("");
        assert_eq!(FromStrAdapter::<i64>::new().parse("-12", &ctx), Some(-12));
        assert_eq!(FromStrAdapter::<i64>::new().parse("1.5", &ctx), None);
        assert_eq!(FromStrAdapter::<u8>::new().parse("256", &ctx), None);
        assert_eq!(FromStrAdapter::<f64>::new().parse("1.5", &ctx), Some(1.5));
    }

    #[test]
    fn test_boolean_ignores_case() {
        let ctx = guild_context("");
        assert_eq!(BooleanAdapter.parse("TRUE", &ctx), Some(true));
        assert_eq!(BooleanAdapter.parse("False", &ctx), Some(false));
        assert_eq!(BooleanAdapter.parse("yes", &ctx), None);
    }

    #[test]
    fn test_char_requires_single_character() {
        let ctx = guild_context("");
        assert_eq!(CharAdapter.parse("x", &ctx), Some('x'));
        assert_eq!(CharAdapter.parse("é", &ctx), Some('é'));
        assert_eq!(CharAdapter.parse("xy", &ctx), None);
        assert_eq!(CharAdapter.parse("", &ctx), None);
    }
}
