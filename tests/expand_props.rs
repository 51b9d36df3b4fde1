use proptest::prelude::*;
use smallsh::expand::expand;
use smallsh::parser::Parser;

proptest! {
    #[test]
    fn tokens_without_marker_are_unchanged(token in "[^$]*", pid in any::<u32>()) {
        prop_assert_eq!(expand(&token, pid), token.as_str());
    }

    #[test]
    fn single_dollars_survive(token in "[a-z]{0,4}(\\$[a-z]{1,4})*", pid in any::<u32>()) {
        prop_assert_eq!(expand(&token, pid), token.as_str());
    }

    #[test]
    fn every_marker_pair_becomes_the_pid(pairs in 0usize..8, pid in any::<u32>()) {
        let token = "$$".repeat(pairs);
        prop_assert_eq!(expand(&token, pid).into_owned(), pid.to_string().repeat(pairs));
    }

    #[test]
    fn parsed_words_never_contain_whitespace(line in "[ a-z<>&#$\\t]{0,40}") {
        let command = Parser::new(7, 512).parse(&line).unwrap();
        for word in &command.words {
            prop_assert!(!word.is_empty());
            prop_assert!(!word.contains(char::is_whitespace));
            prop_assert!(!word.contains("$$"));
        }
        prop_assert_eq!(command.is_dispatchable(), !command.words.is_empty());
    }
}
