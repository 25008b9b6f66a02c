#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|source: &str| {
    for form in snek::split_forms(source) {
        if let Ok(sexp) = snek::parse_str(&form) {
            // Whatever parses must print back to something that parses the same way
            let printed = sexp.to_string();
            assert_eq!(snek::parse_str(&printed).map(|reparsed| reparsed.to_string()), Ok(printed));
        }
    }
});
