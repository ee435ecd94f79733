//! A built-in address space shaped like a freshly exec'd xv6 process.

use ptwalk::{
    MemoryLayout,
    arch::{PAGE_SIZE, PageTableFlags},
    paging::{PhysAddr, VirtAddr},
};

use crate::memory::{AddressSpaceBuilder, Snapshot};

/// Where the kernel's data segment starts. Everything from the kernel link address up to here is
/// text and read-only data.
pub const KERNEL_DATA: u32 = 0x8010_b000;

/// First frame handed to page tables and user pages.
pub const FIRST_FRAME: u32 = 0x0dc0_0000;

/// `initcode.S`, as the kernel copies it into the first process.
pub const INIT_CODE: &[u8] = &[
    0x68, 0x24, 0x00, 0x00, 0x00, // push $argv
    0x68, 0x1c, 0x00, 0x00, 0x00, // push $init
    0x6a, 0x00, // push $0
    0xb8, 0x07, 0x00, 0x00, 0x00, // mov $SYS_exec, %eax
    0xcd, 0x40, // int $T_SYSCALL
    0xb8, 0x02, 0x00, 0x00, 0x00, // mov $SYS_exit, %eax
    0xcd, 0x40, // int $T_SYSCALL
    0xeb, 0xf7, // jmp exit
    b'/', b'i', b'n', b'i', b't', 0x00, 0x00, 0x00, // init
    0x1c, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // argv
];

/// Builds the kernel half the way `setupkvm` does with `kmap`.
pub fn map_kernel(builder: &mut AddressSpaceBuilder, layout: &MemoryLayout) {
    let writable = PageTableFlags::WRITABLE;
    let kernel_link = layout.kernel_base + layout.extmem;
    let kernel_data = KERNEL_DATA - layout.kernel_base;

    // I/O space.
    builder.map_range(
        VirtAddr::new(layout.kernel_base),
        PhysAddr::new(0),
        layout.extmem,
        writable,
    );
    // Kernel text and read-only data.
    builder.map_range(
        VirtAddr::new(kernel_link),
        PhysAddr::new(layout.extmem),
        kernel_data - layout.extmem,
        PageTableFlags::empty(),
    );
    // Kernel data and the rest of physical memory.
    builder.map_range(
        VirtAddr::new(KERNEL_DATA),
        PhysAddr::new(kernel_data),
        layout.phystop - kernel_data,
        writable,
    );
    // Devices, up to the top of the address space.
    builder.map_range(
        VirtAddr::new(layout.devspace),
        PhysAddr::new(layout.devspace),
        0u32.wrapping_sub(layout.devspace),
        writable,
    );
}

/// An xv6 process right after `exec("/init")`: one page of code, a guard page and a stack page,
/// on top of the kernel mappings.
pub fn xv6_process() -> Snapshot {
    let layout = MemoryLayout::XV6;
    let mut builder = AddressSpaceBuilder::new(PhysAddr::new(FIRST_FRAME), layout);
    map_kernel(&mut builder, &layout);

    let user = PageTableFlags::WRITABLE | PageTableFlags::USER_ACCESSIBLE;
    builder.map_data(VirtAddr::new(0), INIT_CODE, user);
    let guard = VirtAddr::new(PAGE_SIZE);
    builder.map_data(guard, &[], user);
    builder.clear_user(guard);
    let stack = builder.map_data(VirtAddr::new(2 * PAGE_SIZE), &[], user);
    // argv[0] and the fake return address at the top of the stack.
    builder.write_bytes(PhysAddr::new(stack.as_u32() + PAGE_SIZE - 8), &[0xff; 4]);

    builder.build()
}
