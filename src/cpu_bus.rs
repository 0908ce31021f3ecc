//! Trait representing the minimal bus interface required by the 6502 core.

pub trait CpuBus {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, data: u8);

    /// Little-endian word at `addr`; the high byte comes from `addr + 1` with
    /// 16-bit wraparound.
    fn read_u16(&mut self, addr: u16) -> u16 {
        let lo = self.read(addr) as u16;
        let hi = self.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    fn write_u16(&mut self, addr: u16, value: u16) {
        self.write(addr, (value & 0xFF) as u8);
        self.write(addr.wrapping_add(1), (value >> 8) as u8);
    }

    /// Little-endian word from the zero page. The pointer byte wraps within
    /// the page, so a pointer at 0xFF takes its high byte from 0x00.
    fn read_u16_zero_page(&mut self, ptr: u8) -> u16 {
        let lo = self.read(ptr as u16) as u16;
        let hi = self.read(ptr.wrapping_add(1) as u16) as u16;
        (hi << 8) | lo
    }
}
