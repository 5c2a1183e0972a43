//! Pack an Imu6 frame, then validate and parse it as a receiver would.
//!
//! Run with:
//!   cargo run -p idtp --example pack_parse
//!
//! The second half swaps in a custom `IntegrityEngine`, the hook for a
//! hardware CRC unit or crypto accelerator on a microcontroller.

use idtp::frame::{
    FrameCodec, Header, Imu3Acc, Imu3Gyr, Imu6, IntegrityEngine, Mode, Payload, Result,
    SoftwareEngine, FRAME_MAX_SIZE, HMAC_TAG_SIZE,
};

/// Counts CRC-32 requests and delegates the math. A real accelerator would
/// drive its peripheral registers here.
#[derive(Default)]
struct CountingEngine {
    crc32_calls: std::cell::Cell<u32>,
}

impl IntegrityEngine for CountingEngine {
    fn crc8(&self, data: &[u8]) -> u8 {
        SoftwareEngine.crc8(data)
    }

    fn crc32(&self, data: &[u8]) -> u32 {
        self.crc32_calls.set(self.crc32_calls.get() + 1);
        SoftwareEngine.crc32(data)
    }

    fn hmac_sha256(&self, data: &[u8], key: &[u8]) -> Result<[u8; HMAC_TAG_SIZE]> {
        SoftwareEngine.hmac_sha256(data, key)
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let imu = Imu6 {
        acc: Imu3Acc {
            acc_x: 0.001,
            acc_y: 0.002,
            acc_z: 9.81,
        },
        gyr: Imu3Gyr {
            gyr_x: 0.004,
            gyr_y: 0.005,
            gyr_z: 0.006,
        },
    };
    let header = Header {
        device_id: 0xABCD,
        timestamp: 12_345_678,
        sequence: 1,
        mode: Mode::Safety.into(),
        payload_type: Imu6::TYPE_ID,
        ..Header::new()
    };

    // Sender.
    let mut payload = [0u8; Imu6::SIZE];
    imu.write(&mut payload)?;
    let codec = FrameCodec::new();
    let mut wire = [0u8; FRAME_MAX_SIZE];
    let size = codec.pack(&header, &payload, &mut wire)?;
    println!("packed {size} bytes: {:02X?}", &wire[..size]);

    // Receiver: integrity only, then a full decode.
    let incoming = &wire[..size];
    codec.validate(incoming)?;
    let frame = codec.parse(incoming)?;
    let decoded: Imu6 = frame.payload_as()?;
    println!(
        "device 0x{:04X} seq {} acc_z {} gyr_z {}",
        frame.header().device_id,
        frame.header().sequence,
        decoded.acc.acc_z,
        decoded.gyr.gyr_z
    );

    // Same frame through a custom engine.
    let engine = CountingEngine::default();
    let accelerated = FrameCodec::with_engine(&engine);
    let mut again = [0u8; FRAME_MAX_SIZE];
    let size = accelerated.pack(&header, &payload, &mut again)?;
    accelerated.validate(&again[..size])?;
    assert_eq!(&again[..size], incoming);
    println!(
        "custom engine produced an identical frame ({} CRC-32 calls)",
        engine.crc32_calls.get()
    );

    Ok(())
}
