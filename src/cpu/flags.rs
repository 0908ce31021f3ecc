use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusFlags: u8 {
        const CARRY = 0b00000001;
        const ZERO = 0b00000010;
        const INTERRUPT_DISABLE = 0b00000100;
        const DECIMAL = 0b00001000;
        const BREAK = 0b00010000;
        const UNUSED = 0b00100000;
        const OVERFLOW = 0b01000000;
        const NEGATIVE = 0b10000000;
    }
}

impl StatusFlags {
    /// Power-on value: only the always-one padding bit.
    pub const fn power_on() -> Self {
        StatusFlags::UNUSED
    }

    pub fn set_flag(&mut self, flag: StatusFlags) {
        self.insert(flag);
    }

    pub fn clear_flag(&mut self, flag: StatusFlags) {
        self.remove(flag);
    }

    pub fn toggle_flag(&mut self, flag: StatusFlags) {
        self.toggle(flag);
    }

    pub fn is_set(&self, flag: StatusFlags) -> bool {
        self.contains(flag)
    }

    /// Zero <- value == 0, Negative <- bit 7. Nothing else changes.
    pub fn apply_zero_negative(&mut self, value: u8) {
        self.set(StatusFlags::ZERO, value == 0);
        self.set(StatusFlags::NEGATIVE, value & 0x80 != 0);
    }

    /// Carry as the 0/1 addend used by ADC, SBC and the rotates.
    pub fn carry_bit(&self) -> u8 {
        self.contains(StatusFlags::CARRY) as u8
    }

    /// Value pushed by PHP and BRK: Break and the padding bit are always set
    /// in the pushed copy.
    pub fn to_pushed_byte(self) -> u8 {
        (self | StatusFlags::BREAK | StatusFlags::UNUSED).bits()
    }

    /// Value restored by PLP and RTI: Break does not exist in the live
    /// register and the padding bit always reads as one.
    pub fn from_pulled_byte(byte: u8) -> Self {
        (StatusFlags::from_bits_retain(byte) - StatusFlags::BREAK) | StatusFlags::UNUSED
    }
}

impl Default for StatusFlags {
    fn default() -> Self {
        Self::power_on()
    }
}

impl std::fmt::Display for StatusFlags {
    /// Renders as `NV-BDIZC` with lowercase letters for clear bits.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const NAMES: [(StatusFlags, char); 8] = [
            (StatusFlags::NEGATIVE, 'N'),
            (StatusFlags::OVERFLOW, 'V'),
            (StatusFlags::UNUSED, '-'),
            (StatusFlags::BREAK, 'B'),
            (StatusFlags::DECIMAL, 'D'),
            (StatusFlags::INTERRUPT_DISABLE, 'I'),
            (StatusFlags::ZERO, 'Z'),
            (StatusFlags::CARRY, 'C'),
        ];
        for (flag, name) in NAMES {
            let c = if self.contains(flag) { name } else { name.to_ascii_lowercase() };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}
