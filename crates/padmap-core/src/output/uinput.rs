// Padmap uinput Output Layer
// One virtual gamepad per pad; setters stage events, submit emits them

#![cfg(feature = "uinput")]

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{
    AbsInfo, AbsoluteAxisType, AttributeSet, BusType, EventType, InputEvent, InputId, Key,
    UinputAbsSetup,
};
use strum::IntoEnumIterator;

use super::sink::{OutputSink, SinkError};
use crate::control::{Axis, Button, Slider};

// Wired Xbox 360 pad ids
const VENDOR_ID: u16 = 0x045e;
const PRODUCT_ID: u16 = 0x028e;

fn button_key(button: Button) -> Key {
    match button {
        Button::Up => Key::BTN_DPAD_UP,
        Button::Down => Key::BTN_DPAD_DOWN,
        Button::Left => Key::BTN_DPAD_LEFT,
        Button::Right => Key::BTN_DPAD_RIGHT,
        Button::A => Key::BTN_SOUTH,
        Button::B => Key::BTN_EAST,
        Button::X => Key::BTN_NORTH,
        Button::Y => Key::BTN_WEST,
        Button::Start => Key::BTN_START,
        Button::Back => Key::BTN_SELECT,
        Button::Guide => Key::BTN_MODE,
        Button::LeftShoulder => Key::BTN_TL,
        Button::LeftThumb => Key::BTN_THUMBL,
        Button::RightShoulder => Key::BTN_TR,
        Button::RightThumb => Key::BTN_THUMBR,
    }
}

fn axis_code(axis: Axis) -> AbsoluteAxisType {
    match axis {
        Axis::LeftThumbX => AbsoluteAxisType::ABS_X,
        Axis::LeftThumbY => AbsoluteAxisType::ABS_Y,
        Axis::RightThumbX => AbsoluteAxisType::ABS_RX,
        Axis::RightThumbY => AbsoluteAxisType::ABS_RY,
    }
}

fn slider_code(slider: Slider) -> AbsoluteAxisType {
    match slider {
        Slider::LeftTrigger => AbsoluteAxisType::ABS_Z,
        Slider::RightTrigger => AbsoluteAxisType::ABS_RZ,
    }
}

/// evdev Y axes grow downwards, pad values grow upwards
fn axis_event_value(axis: Axis, value: i16) -> i32 {
    match axis {
        Axis::LeftThumbY | Axis::RightThumbY => (-(value as i32)).min(i16::MAX as i32),
        Axis::LeftThumbX | Axis::RightThumbX => value as i32,
    }
}

struct PadDevice {
    device: VirtualDevice,
    staged: Vec<InputEvent>,
}

/// Output sink backed by uinput gamepads
pub struct VirtualPadSink {
    pads: Vec<PadDevice>,
}

impl VirtualPadSink {
    /// Create `pad_count` virtual gamepads
    pub fn new(pad_count: usize) -> Result<Self, SinkError> {
        let mut pads = Vec::with_capacity(pad_count);
        for index in 0..pad_count {
            let device = Self::build_device(index)
                .map_err(|source| SinkError::Io { device_index: index, source })?;
            log::info!("created virtual pad {}", index + 1);
            pads.push(PadDevice {
                device,
                staged: Vec::new(),
            });
        }
        let mut sink = Self { pads };
        sink.reset_all()?;
        Ok(sink)
    }

    fn build_device(index: usize) -> std::io::Result<VirtualDevice> {
        let mut keys = AttributeSet::<Key>::new();
        for button in Button::iter() {
            keys.insert(button_key(button));
        }

        let stick = AbsInfo::new(0, i16::MIN as i32, i16::MAX as i32, 16, 128, 0);
        let trigger = AbsInfo::new(0, 0, u8::MAX as i32, 0, 0, 0);

        let name = format!("Padmap (virtual) Pad {}", index + 1);
        let mut builder = VirtualDeviceBuilder::new()?
            .name(&name)
            .input_id(InputId::new(BusType::BUS_USB, VENDOR_ID, PRODUCT_ID, 0x0110))
            .with_keys(&keys)?;
        for axis in Axis::iter() {
            builder = builder.with_absolute_axis(&UinputAbsSetup::new(axis_code(axis), stick))?;
        }
        for slider in Slider::iter() {
            builder = builder.with_absolute_axis(&UinputAbsSetup::new(slider_code(slider), trigger))?;
        }
        builder.build()
    }

    pub fn pad_count(&self) -> usize {
        self.pads.len()
    }

    fn pad(&mut self, device_index: usize) -> Result<&mut PadDevice, SinkError> {
        self.pads
            .get_mut(device_index)
            .ok_or(SinkError::DeviceUnavailable { device_index })
    }

    /// Release every button and center every axis on all pads
    pub fn reset_all(&mut self) -> Result<(), SinkError> {
        for index in 0..self.pads.len() {
            for button in Button::iter() {
                self.set_button_state(index, button, false)?;
            }
            for axis in Axis::iter() {
                self.set_axis_value(index, axis, 0)?;
            }
            for slider in Slider::iter() {
                self.set_slider_value(index, slider, 0)?;
            }
            self.submit(index)?;
        }
        Ok(())
    }
}

impl OutputSink for VirtualPadSink {
    fn set_button_state(&mut self, device_index: usize, button: Button, pressed: bool) -> Result<(), SinkError> {
        let key = button_key(button);
        self.pad(device_index)?
            .staged
            .push(InputEvent::new(EventType::KEY, key.code(), pressed as i32));
        Ok(())
    }

    fn set_axis_value(&mut self, device_index: usize, axis: Axis, value: i16) -> Result<(), SinkError> {
        let code = axis_code(axis);
        self.pad(device_index)?.staged.push(InputEvent::new(
            EventType::ABSOLUTE,
            code.0,
            axis_event_value(axis, value),
        ));
        Ok(())
    }

    fn set_slider_value(&mut self, device_index: usize, slider: Slider, value: u8) -> Result<(), SinkError> {
        let code = slider_code(slider);
        self.pad(device_index)?
            .staged
            .push(InputEvent::new(EventType::ABSOLUTE, code.0, value as i32));
        Ok(())
    }

    fn submit(&mut self, device_index: usize) -> Result<(), SinkError> {
        let pad = self.pad(device_index)?;
        if pad.staged.is_empty() {
            return Ok(());
        }
        // emit() terminates the batch with SYN_REPORT
        let result = pad.device.emit(&pad.staged);
        pad.staged.clear();
        result.map_err(|source| SinkError::Io { device_index, source })
    }
}
