#![no_main]

use libfuzzer_sys::fuzz_target;
use things_core::engine::Engine;
use things_core::event::codec::decode;
use things_core::state::project;

fuzz_target!(|data: &[u8]| {
    let Ok(events) = decode(data) else {
        return;
    };

    // The projector must not panic on any decodable log.
    let state = project(&events);

    if let Ok(engine) = Engine::replay(events) {
        assert!(engine.state().check_invariants().is_ok());
        assert_eq!(*engine.state(), state);
    }
});
