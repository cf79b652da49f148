use go_syntax::lexer::{Lexer, Tok};
use go_syntax::{parse_source, LineIndex, LineTable, Position};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn lexer_never_panics_and_progresses(s in ".*") {
        let mut last_real_end = 0usize;
        let mut max_end = 0usize;
        let max_steps = s.len().saturating_mul(4) + 64;

        for (steps, (start, tok, end)) in Lexer::new(&s).enumerate() {
            prop_assert!(start <= end && end <= s.len(), "bad span ({start},{end}) tok={tok:?}");

            if matches!(tok, Tok::Semi) && start == end {
                prop_assert!(start >= max_end, "injected semi behind progress at {start}");
            } else {
                prop_assert!(start >= last_real_end, "token moved backwards at {start}");
                last_real_end = end;
            }
            max_end = max_end.max(end);
            prop_assert!(steps <= max_steps, "possible hang after {steps} tokens");
        }
    }

    #[test]
    fn parser_never_panics(s in "[a-z(){};:=+*\\[\\]., \n\t\"0-9]{0,80}") {
        let _ = parse_source(&format!("package p\n{s}"));
    }

    #[test]
    fn line_index_round_trips_offsets(lines in proptest::collection::vec("[a-z ]{0,12}", 1..20)) {
        let text: String = lines.iter().map(|l| format!("{l}\n")).collect();
        let table = LineTable::from_text(&text);
        prop_assert_eq!(table.total_len() as usize, text.len());
        prop_assert_eq!(LineTable::from_line_starts(&table.to_line_starts(), table.total_len()), table.clone());

        let index = LineIndex::new(&table);
        for offset in 0..text.len() as u32 {
            let pos = index.position(offset);
            prop_assert_eq!(index.offset(pos), Some(offset));
            prop_assert!(pos >= Position::new(1, 1));
        }
    }
}
