use otpgen::TotpEngine;

#[derive(Clone, Default)]
pub struct AppState {
    pub engine: TotpEngine,
}

impl AppState {
    pub fn new(engine: TotpEngine) -> Self {
        Self { engine }
    }
}
