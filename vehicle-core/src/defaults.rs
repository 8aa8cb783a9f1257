//! Default vehicle snapshot loaded at startup

use crate::SignalTree;

/// VIN reported by the simulated vehicle
pub const DEFAULT_VIN: &str = "DREAMKIT00000001";

/// Build the fixed snapshot the store starts from
pub fn default_tree() -> SignalTree {
    SignalTree::new()
        .with("VehicleSpeed", 0)
        .with("EngineRPM", 0)
        .with("FuelLevel", 75)
        .with("BatteryLevel", 95)
        .with("InsideTemperature", 22.5)
        .with("OutsideTemperature", 15.0)
        .with("VIN", DEFAULT_VIN)
        .with("ODO", 1250)
        .with(
            "Lights",
            SignalTree::new()
                .with("Headlights", "OFF")
                .with("HighBeam", "OFF")
                .with("Hazard", "OFF"),
        )
        .with(
            "Doors",
            SignalTree::new()
                .with("DriverDoor", "CLOSED")
                .with("PassengerDoor", "CLOSED")
                .with("RearLeftDoor", "CLOSED")
                .with("RearRightDoor", "CLOSED"),
        )
        .with(
            "Windows",
            SignalTree::new()
                .with("DriverWindow", "CLOSED")
                .with("PassengerWindow", "CLOSED")
                .with("RearLeftWindow", "CLOSED")
                .with("RearRightWindow", "CLOSED"),
        )
}
