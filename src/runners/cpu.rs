//! CPU execution for compute kernels
//!
//! Emulates a work-group device: every launch walks the work-groups of its
//! grid and runs the matching `kernel` body for each. Work-groups whose
//! writes are disjoint run concurrently on a dedicated rayon pool; the radix
//! scatter, whose destinations depend on the data, runs serially.

use crate::{
    config::ComputeConfig,
    device::{BackendInfo, CompileFlags, ComputeDevice, KernelModule, WorkDescriptor},
    error::{ComputeError, Result},
};
use bytemuck::Pod;
use glam::UVec2;
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use shared::{
    BitonicParams, CombineOp, DeviceElement, ElementKind, RadixParams, ReduceParams, ScanMode,
    ScanParams, SortOrder, TransposeParams, MAX_RADIX_BITS,
};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Device allocation of the CPU runner
#[derive(Debug)]
pub struct CpuMemory {
    kind: ElementKind,
    words: RwLock<Vec<u32>>,
}

impl CpuMemory {
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.words.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum CpuEntry {
    ReduceSum,
    ReduceMax,
    PrefixSum,
    BitonicLargeArray,
    BitonicSmallArray,
    FillBitCount,
    MoveNumbers,
    MatrixTranspose,
}

impl CpuEntry {
    fn resolve(module: KernelModule, entry_point: &str) -> Option<Self> {
        let entry = match (module, entry_point) {
            (KernelModule::Reduce, "sum") => CpuEntry::ReduceSum,
            (KernelModule::Reduce, "max") => CpuEntry::ReduceMax,
            (KernelModule::Scan, "prefix_sum") => CpuEntry::PrefixSum,
            (KernelModule::Bitonic, "bitonic_large_array") => CpuEntry::BitonicLargeArray,
            (KernelModule::Bitonic, "bitonic_small_array") => CpuEntry::BitonicSmallArray,
            (KernelModule::Radix, "fill_bit_count") => CpuEntry::FillBitCount,
            (KernelModule::Radix, "move_numbers") => CpuEntry::MoveNumbers,
            (KernelModule::Transpose, "matrix_transpose") => CpuEntry::MatrixTranspose,
            _ => return None,
        };
        Some(entry)
    }

    fn name(self) -> &'static str {
        match self {
            CpuEntry::ReduceSum => "sum",
            CpuEntry::ReduceMax => "max",
            CpuEntry::PrefixSum => "prefix_sum",
            CpuEntry::BitonicLargeArray => "bitonic_large_array",
            CpuEntry::BitonicSmallArray => "bitonic_small_array",
            CpuEntry::FillBitCount => "fill_bit_count",
            CpuEntry::MoveNumbers => "move_numbers",
            CpuEntry::MatrixTranspose => "matrix_transpose",
        }
    }

    fn is_radix(self) -> bool {
        matches!(self, CpuEntry::FillBitCount | CpuEntry::MoveNumbers)
    }
}

/// A resolved entry point with its compile-time constants
#[derive(Clone, Debug)]
pub struct CpuKernel {
    entry: CpuEntry,
    flags: CompileFlags,
}

impl CpuKernel {
    pub fn entry_point(&self) -> &'static str {
        self.entry.name()
    }

    pub fn flags(&self) -> &CompileFlags {
        &self.flags
    }
}

/// One entry of the launch log
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchRecord {
    pub entry_point: &'static str,
    pub workgroups: [u32; 3],
}

/// Software work-group device backed by a rayon thread pool
pub struct CpuDevice {
    pool: rayon::ThreadPool,
    threads: usize,
    launch_total: AtomicUsize,
    record_launches: bool,
    launches: Mutex<Vec<LaunchRecord>>,
}

impl CpuDevice {
    pub fn new(config: &ComputeConfig) -> Result<Self> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|i| format!("cpu-device-{i}"))
            .build()?;
        tracing::debug!(threads = config.threads, "created CPU device");
        Ok(Self {
            pool,
            threads: config.threads,
            launch_total: AtomicUsize::new(0),
            record_launches: true,
            launches: Mutex::new(Vec::new()),
        })
    }

    /// Turns the per-launch log on or off. Long-lived devices should turn it
    /// off; `launch_count` keeps counting either way.
    pub fn with_launch_log(mut self, enabled: bool) -> Self {
        self.record_launches = enabled;
        if !enabled {
            self.launches.get_mut().clear();
        }
        self
    }

    /// Every recorded launch, in program order
    pub fn launch_log(&self) -> Vec<LaunchRecord> {
        self.launches.lock().clone()
    }

    /// Launches issued so far, recorded or not
    pub fn launch_count(&self) -> usize {
        self.launch_total.load(Ordering::Relaxed)
    }

    pub fn count_launches(&self, entry_point: &str) -> usize {
        self.launches
            .lock()
            .iter()
            .filter(|r| r.entry_point == entry_point)
            .count()
    }

    /// Drops the recorded launches and resets the count
    pub fn clear_launch_log(&self) {
        self.launches.lock().clear();
        self.launch_total.store(0, Ordering::Relaxed);
    }
}

impl ComputeDevice for CpuDevice {
    type Memory = CpuMemory;
    type Kernel = CpuKernel;

    fn backend_info(&self) -> BackendInfo {
        BackendInfo {
            backend: "cpu",
            api: Some("Native"),
            adapter: Some(format!("{} worker threads", self.threads)),
            driver: None,
        }
    }

    fn allocate_memory(&self, kind: ElementKind, len: usize) -> Result<CpuMemory> {
        len.checked_mul(ElementKind::WIDTH)
            .ok_or(ComputeError::BufferSizeOverflow(len, ElementKind::WIDTH))?;
        let mut words = Vec::new();
        words
            .try_reserve_exact(len)
            .map_err(|_| ComputeError::AllocationFailed { elements: len })?;
        words.resize(len, 0);
        Ok(CpuMemory {
            kind,
            words: RwLock::new(words),
        })
    }

    fn write_memory(&self, memory: &CpuMemory, words: &[u32]) -> Result<()> {
        let mut dst = memory.words.write();
        if dst.len() != words.len() {
            return Err(ComputeError::LengthMismatch {
                expected: dst.len(),
                actual: words.len(),
            });
        }
        dst.copy_from_slice(words);
        Ok(())
    }

    fn read_memory(&self, memory: &CpuMemory, words: &mut [u32]) -> Result<()> {
        let src = memory.words.read();
        if src.len() != words.len() {
            return Err(ComputeError::LengthMismatch {
                expected: src.len(),
                actual: words.len(),
            });
        }
        words.copy_from_slice(&src);
        Ok(())
    }

    fn compile(
        &self,
        module: KernelModule,
        entry_point: &str,
        flags: &CompileFlags,
    ) -> Result<CpuKernel> {
        let entry = CpuEntry::resolve(module, entry_point)
            .ok_or_else(|| ComputeError::KernelNotFound(format!("{module}::{entry_point}")))?;
        let compile_error = |reason: String| ComputeError::Compile {
            entry_point: entry_point.to_string(),
            reason,
        };

        if flags.work_group_size == 0 {
            return Err(compile_error("WORK_GROUP_SIZE must be non-zero".into()));
        }
        if matches!(entry, CpuEntry::BitonicLargeArray | CpuEntry::BitonicSmallArray)
            && !flags.work_group_size.is_power_of_two()
        {
            return Err(compile_error(format!(
                "WORK_GROUP_SIZE={} must be a power of two",
                flags.work_group_size
            )));
        }
        if entry.is_radix() {
            if flags.element != ElementKind::U32 {
                return Err(compile_error(format!(
                    "radix kernels take u32 keys, not {}",
                    flags.element
                )));
            }
            match flags.radix_bits {
                Some(bits) if (1..=MAX_RADIX_BITS).contains(&bits) => {}
                other => {
                    return Err(compile_error(format!("invalid RADIX_BITS {other:?}")));
                }
            }
        }

        tracing::debug!(%module, entry_point, %flags, "compiled kernel");
        Ok(CpuKernel {
            entry,
            flags: *flags,
        })
    }

    fn launch(
        &self,
        kernel: &CpuKernel,
        work: &WorkDescriptor,
        buffers: &[&CpuMemory],
        push_constants: &[u8],
    ) -> Result<()> {
        let name = kernel.entry.name();
        if work.local.x == 0 || work.local.y == 0 {
            return Err(launch_error(name, "empty work-group shape"));
        }
        for (i, a) in buffers.iter().enumerate() {
            if buffers[i + 1..].iter().any(|b| std::ptr::eq(*a, *b)) {
                return Err(ComputeError::AliasedBuffers(name));
            }
        }
        if let Some(memory) = buffers.iter().find(|m| m.kind != kernel.flags.element) {
            return Err(ComputeError::ElementMismatch {
                expected: kernel.flags.element,
                found: memory.kind,
            });
        }

        let workgroups = work.num_workgroups();
        tracing::debug!(entry_point = name, ?workgroups, "launch");
        self.launch_total.fetch_add(1, Ordering::Relaxed);
        if self.record_launches {
            self.launches.lock().push(LaunchRecord {
                entry_point: name,
                workgroups,
            });
        }

        self.pool.install(|| {
            if kernel.entry.is_radix() {
                return execute_radix(kernel, work, buffers, push_constants);
            }
            match kernel.flags.element {
                ElementKind::U32 => execute::<u32>(kernel, work, buffers, push_constants),
                ElementKind::I32 => execute::<i32>(kernel, work, buffers, push_constants),
                ElementKind::F32 => execute::<f32>(kernel, work, buffers, push_constants),
            }
        })
    }
}

fn launch_error(entry_point: &'static str, reason: impl Into<String>) -> ComputeError {
    ComputeError::Launch {
        entry_point,
        reason: reason.into(),
    }
}

fn push_constants<P: Pod>(entry_point: &'static str, bytes: &[u8]) -> Result<P> {
    if bytes.len() != std::mem::size_of::<P>() {
        return Err(launch_error(
            entry_point,
            format!(
                "expected {} bytes of push constants, got {}",
                std::mem::size_of::<P>(),
                bytes.len()
            ),
        ));
    }
    Ok(bytemuck::pod_read_unaligned(bytes))
}

fn expect_buffers(entry_point: &'static str, buffers: &[&CpuMemory], count: usize) -> Result<()> {
    if buffers.len() != count {
        return Err(launch_error(
            entry_point,
            format!("expected {count} buffers, got {}", buffers.len()),
        ));
    }
    Ok(())
}

fn expect_len(entry_point: &'static str, what: &str, len: usize, needed: usize) -> Result<()> {
    if len < needed {
        return Err(launch_error(
            entry_point,
            format!("{what} holds {len} elements, launch needs {needed}"),
        ));
    }
    Ok(())
}

/// Work-group count of a 1-D launch, checked against the compiled width
fn linear_groups(kernel: &CpuKernel, work: &WorkDescriptor, num_elements: usize) -> Result<usize> {
    let name = kernel.entry.name();
    if work.local.x != kernel.flags.work_group_size || work.local.y != 1 {
        return Err(launch_error(
            name,
            format!(
                "work-group {:?} differs from compiled width {}",
                work.local, kernel.flags.work_group_size
            ),
        ));
    }
    if work.extent.x as usize != num_elements || work.extent.y != 1 {
        return Err(launch_error(
            name,
            format!("grid {:?} does not cover {num_elements} elements", work.extent),
        ));
    }
    Ok(num_elements.div_ceil(work.local.x as usize))
}

fn execute<T: DeviceElement>(
    kernel: &CpuKernel,
    work: &WorkDescriptor,
    buffers: &[&CpuMemory],
    push: &[u8],
) -> Result<()> {
    let name = kernel.entry.name();
    let w = kernel.flags.work_group_size as usize;

    match kernel.entry {
        CpuEntry::ReduceSum | CpuEntry::ReduceMax => {
            let op = if kernel.entry == CpuEntry::ReduceSum {
                CombineOp::Sum
            } else {
                CombineOp::Max
            };
            let params: ReduceParams = push_constants(name, push)?;
            let n = params.num_elements as usize;
            expect_buffers(name, buffers, 2)?;
            let groups = linear_groups(kernel, work, n)?;

            let input_words = buffers[0].words.read();
            let mut output_words = buffers[1].words.write();
            let input: &[T] = bytemuck::cast_slice(&input_words);
            let output: &mut [T] = bytemuck::cast_slice_mut(&mut output_words);
            expect_len(name, "input", input.len(), n)?;
            expect_len(name, "output", output.len(), groups)?;

            let input = &input[..n];
            output[..groups].par_iter_mut().enumerate().for_each_init(
                || vec![T::zero(); w],
                |local, (group, out)| *out = kernel::reduce::block_reduce(input, group, local, op),
            );
        }

        CpuEntry::PrefixSum => {
            let params: ScanParams = push_constants(name, push)?;
            let n = params.num_elements as usize;
            let mode = ScanMode::try_from(params.mode).map_err(|e| launch_error(name, e))?;
            let groups = linear_groups(kernel, work, n)?;

            match mode {
                ScanMode::LocalScan => {
                    expect_buffers(name, buffers, 3)?;
                    let input_words = buffers[0].words.read();
                    let mut output_words = buffers[1].words.write();
                    let mut totals_words = buffers[2].words.write();
                    let input: &[T] = bytemuck::cast_slice(&input_words);
                    let output: &mut [T] = bytemuck::cast_slice_mut(&mut output_words);
                    let totals: &mut [T] = bytemuck::cast_slice_mut(&mut totals_words);
                    expect_len(name, "input", input.len(), n)?;
                    expect_len(name, "output", output.len(), n)?;
                    expect_len(name, "block totals", totals.len(), groups)?;

                    output[..n]
                        .par_chunks_mut(w)
                        .zip(totals[..groups].par_iter_mut())
                        .enumerate()
                        .for_each(|(group, (block, total))| {
                            let start = group * w;
                            *total = kernel::scan::local_inclusive_scan(
                                &input[start..start + block.len()],
                                block,
                            );
                        });
                }
                ScanMode::ApplyOffsets => {
                    expect_buffers(name, buffers, 2)?;
                    let offsets_words = buffers[0].words.read();
                    let mut output_words = buffers[1].words.write();
                    let offsets: &[T] = bytemuck::cast_slice(&offsets_words);
                    let output: &mut [T] = bytemuck::cast_slice_mut(&mut output_words);
                    expect_len(name, "offsets", offsets.len(), groups.saturating_sub(1))?;
                    expect_len(name, "output", output.len(), n)?;

                    output[..n]
                        .par_chunks_mut(w)
                        .enumerate()
                        .skip(1)
                        .for_each(|(group, block)| {
                            kernel::scan::apply_block_offset(block, offsets[group - 1]);
                        });
                }
            }
        }

        CpuEntry::BitonicLargeArray | CpuEntry::BitonicSmallArray => {
            let params: BitonicParams = push_constants(name, push)?;
            let n = params.num_elements as usize;
            let order = SortOrder::try_from(params.sort_order).map_err(|e| launch_error(name, e))?;
            let (cur_size, size) = (params.cur_size, params.size);
            expect_buffers(name, buffers, 1)?;
            linear_groups(kernel, work, n)?;
            if n == 0 {
                return Ok(());
            }
            if !n.is_power_of_two() {
                return Err(ComputeError::NotPowerOfTwo(n));
            }
            let span_fits = cur_size
                .checked_mul(2)
                .is_some_and(|span| span <= size && span as usize <= n);
            if !cur_size.is_power_of_two() || !span_fits {
                return Err(launch_error(
                    name,
                    format!("invalid stage cur_size={cur_size} size={size} for {n} elements"),
                ));
            }

            let mut data_words = buffers[0].words.write();
            let data: &mut [T] = bytemuck::cast_slice_mut(&mut data_words);
            expect_len(name, "data", data.len(), n)?;

            if kernel.entry == CpuEntry::BitonicLargeArray {
                let span = 2 * cur_size as usize;
                data[..n]
                    .par_chunks_mut(span)
                    .enumerate()
                    .for_each(|(i, block)| {
                        kernel::bitonic::bitonic_large_array(
                            block,
                            (i * span) as u32,
                            cur_size,
                            size,
                            order,
                        );
                    });
            } else {
                if 2 * cur_size as usize > w {
                    return Err(launch_error(
                        name,
                        format!("cur_size={cur_size} does not fit a work-group of {w}"),
                    ));
                }
                data[..n]
                    .par_chunks_mut(w)
                    .enumerate()
                    .for_each(|(group, block)| {
                        kernel::bitonic::bitonic_small_array(
                            block,
                            (group * w) as u32,
                            cur_size,
                            size,
                            order,
                        );
                    });
            }
        }

        CpuEntry::MatrixTranspose => {
            let params: TransposeParams = push_constants(name, push)?;
            let (rows, cols) = (params.rows as usize, params.cols as usize);
            expect_buffers(name, buffers, 2)?;
            let tile = kernel.flags.work_group_size;
            if work.local.x != tile || work.local.y != tile {
                return Err(launch_error(
                    name,
                    format!("work-group {:?} differs from compiled tile {tile}", work.local),
                ));
            }
            if work.extent != UVec2::new(params.cols, params.rows) {
                return Err(launch_error(
                    name,
                    format!("grid {:?} does not cover a {rows} x {cols} matrix", work.extent),
                ));
            }
            let len = rows * cols;
            if len == 0 {
                return Ok(());
            }
            let tile = tile as usize;

            let input_words = buffers[0].words.read();
            let mut output_words = buffers[1].words.write();
            let input: &[T] = bytemuck::cast_slice(&input_words);
            let output: &mut [T] = bytemuck::cast_slice_mut(&mut output_words);
            expect_len(name, "input", input.len(), len)?;
            expect_len(name, "output", output.len(), len)?;

            let input = &input[..len];
            output[..len]
                .par_chunks_mut(tile * rows)
                .enumerate()
                .for_each_init(
                    || vec![T::zero(); tile * tile],
                    |local, (band, out_band)| {
                        kernel::transpose::matrix_transpose_band(
                            input, rows, cols, band, tile, local, out_band,
                        );
                    },
                );
        }

        CpuEntry::FillBitCount | CpuEntry::MoveNumbers => {
            return Err(launch_error(name, "radix kernels only run on u32 keys"));
        }
    }

    Ok(())
}

fn execute_radix(
    kernel: &CpuKernel,
    work: &WorkDescriptor,
    buffers: &[&CpuMemory],
    push: &[u8],
) -> Result<()> {
    let name = kernel.entry.name();
    let params: RadixParams = push_constants(name, push)?;
    let n = params.num_elements as usize;
    let start = params.start;
    let bits = kernel
        .flags
        .radix_bits
        .ok_or_else(|| launch_error(name, "compiled without RADIX_BITS"))?;
    if start >= u32::BITS {
        return Err(launch_error(name, format!("digit start {start} past key width")));
    }
    linear_groups(kernel, work, n)?;
    let slots = n << bits;

    match kernel.entry {
        CpuEntry::FillBitCount => {
            expect_buffers(name, buffers, 2)?;
            if n == 0 {
                return Ok(());
            }
            let input = buffers[0].words.read();
            let mut counts = buffers[1].words.write();
            expect_len(name, "input", input.len(), n)?;
            expect_len(name, "count buffer", counts.len(), slots)?;

            let input = &input[..n];
            counts[..slots]
                .par_chunks_mut(n)
                .enumerate()
                .for_each(|(digit, row)| {
                    kernel::radix::fill_bit_count(input, row, digit as u32, start, bits);
                });
        }
        CpuEntry::MoveNumbers => {
            expect_buffers(name, buffers, 3)?;
            let input = buffers[0].words.read();
            let mut output = buffers[1].words.write();
            let scanned = buffers[2].words.read();
            expect_len(name, "input", input.len(), n)?;
            expect_len(name, "output", output.len(), n)?;
            expect_len(name, "scanned counts", scanned.len(), slots)?;

            for (i, &value) in input[..n].iter().enumerate() {
                let slot = kernel::radix::scatter_slot(value, i, n, &scanned, start, bits)
                    .filter(|&slot| slot < n)
                    .ok_or_else(|| {
                        launch_error(name, format!("no destination for element {i}"))
                    })?;
                output[slot] = value;
            }
        }
        _ => unreachable!("not a radix entry point"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn device() -> CpuDevice {
        CpuDevice::new(&ComputeConfig::default().with_threads(2)).unwrap()
    }

    #[test]
    fn upload_download_roundtrip() {
        let device = device();
        let array = device.to_device(&[1i32, -2, 3]).unwrap();
        assert_eq!(array.memory().kind(), ElementKind::I32);
        assert_eq!(array.memory().len(), 3);
        assert!(device.allocate::<f32>(0).unwrap().memory().is_empty());
        assert_eq!(device.to_host(&array).unwrap(), vec![1, -2, 3]);
        assert!(matches!(
            device.upload(&array, &[1, 2]),
            Err(ComputeError::LengthMismatch { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn swap_exchanges_allocations() {
        let device = device();
        let mut a = device.to_device(&[1u32, 2]).unwrap();
        let mut b = device.to_device(&[3u32, 4]).unwrap();
        device.swap(&mut a, &mut b).unwrap();
        assert_eq!(device.to_host(&a).unwrap(), vec![3, 4]);
        assert_eq!(device.to_host(&b).unwrap(), vec![1, 2]);

        let mut c = device.allocate::<u32>(3).unwrap();
        assert!(device.swap(&mut a, &mut c).is_err());
    }

    #[test]
    fn unknown_entry_point() {
        let device = device();
        let flags = CompileFlags::new(256, ElementKind::U32);
        assert!(matches!(
            device.compile(KernelModule::Scan, "scan_everything", &flags),
            Err(ComputeError::KernelNotFound(name)) if name == "scan::scan_everything"
        ));
    }

    #[test]
    fn every_entry_point_compiles() {
        let device = device();
        let flags = CompileFlags::new(4, ElementKind::U32).with_radix_bits(2);
        for module in [
            KernelModule::Reduce,
            KernelModule::Scan,
            KernelModule::Bitonic,
            KernelModule::Radix,
            KernelModule::Transpose,
        ] {
            for entry_point in module.entry_points() {
                let kernel = device.compile(module, entry_point, &flags).unwrap();
                assert_eq!(kernel.entry_point(), *entry_point);
                assert_eq!(kernel.flags(), &flags);
            }
        }
    }

    #[test]
    fn radix_kernels_need_u32_and_radix_bits() {
        let device = device();
        let flags = CompileFlags::new(256, ElementKind::I32).with_radix_bits(2);
        assert!(matches!(
            device.compile(KernelModule::Radix, "fill_bit_count", &flags),
            Err(ComputeError::Compile { .. })
        ));
        let flags = CompileFlags::new(256, ElementKind::U32);
        assert!(device
            .compile(KernelModule::Radix, "move_numbers", &flags)
            .is_err());
    }

    #[test]
    fn rejects_aliased_buffers() {
        let device = device();
        let kernel = device
            .compile(KernelModule::Reduce, "sum", &CompileFlags::new(4, ElementKind::U32))
            .unwrap();
        let array = device.to_device(&[1u32, 2, 3, 4]).unwrap();
        let params = ReduceParams { num_elements: 4 };
        let err = device
            .launch(
                &kernel,
                &WorkDescriptor::linear(4, 4),
                &[array.memory(), array.memory()],
                bytemuck::bytes_of(&params),
            )
            .unwrap_err();
        assert!(matches!(err, ComputeError::AliasedBuffers("sum")));
    }

    #[test]
    fn rejects_element_mismatch() {
        let device = device();
        let kernel = device
            .compile(KernelModule::Reduce, "max", &CompileFlags::new(4, ElementKind::I32))
            .unwrap();
        let input = device.to_device(&[1.0f32, 2.0]).unwrap();
        let output = device.allocate::<f32>(1).unwrap();
        let params = ReduceParams { num_elements: 2 };
        let err = device
            .launch(
                &kernel,
                &WorkDescriptor::linear(4, 2),
                &[input.memory(), output.memory()],
                bytemuck::bytes_of(&params),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            ComputeError::ElementMismatch {
                expected: ElementKind::I32,
                found: ElementKind::F32
            }
        ));
    }

    #[test]
    fn reduce_launch_writes_one_value_per_group() {
        let device = device();
        let kernel = device
            .compile(KernelModule::Reduce, "sum", &CompileFlags::new(4, ElementKind::U32))
            .unwrap();
        let input = device.to_device(&(1..=10).collect::<Vec<u32>>()).unwrap();
        let output = device.allocate::<u32>(3).unwrap();
        let params = ReduceParams { num_elements: 10 };
        device
            .launch(
                &kernel,
                &WorkDescriptor::linear(4, 10),
                &[input.memory(), output.memory()],
                bytemuck::bytes_of(&params),
            )
            .unwrap();
        assert_eq!(device.to_host(&output).unwrap(), vec![10, 26, 19]);
        assert_eq!(
            device.launch_log(),
            vec![LaunchRecord {
                entry_point: "sum",
                workgroups: [3, 1, 1]
            }]
        );
    }

    #[test]
    fn launch_log_can_be_cleared_or_disabled() {
        let params = ReduceParams { num_elements: 4 };
        let run = |device: &CpuDevice| {
            let kernel = device
                .compile(KernelModule::Reduce, "max", &CompileFlags::new(4, ElementKind::U32))
                .unwrap();
            let input = device.to_device(&[4u32, 1, 3, 2]).unwrap();
            let output = device.allocate::<u32>(1).unwrap();
            for _ in 0..3 {
                device
                    .launch(
                        &kernel,
                        &WorkDescriptor::linear(4, 4),
                        &[input.memory(), output.memory()],
                        bytemuck::bytes_of(&params),
                    )
                    .unwrap();
            }
            assert_eq!(device.to_host(&output).unwrap(), vec![4]);
        };

        let logged = device();
        run(&logged);
        assert_eq!(logged.launch_log().len(), 3);
        logged.clear_launch_log();
        assert!(logged.launch_log().is_empty());
        assert_eq!(logged.launch_count(), 0);

        let quiet = device().with_launch_log(false);
        run(&quiet);
        assert!(quiet.launch_log().is_empty());
        assert_eq!(quiet.launch_count(), 3);
        assert_eq!(quiet.count_launches("max"), 0);
    }

    #[test]
    fn transpose_grid_must_match_the_matrix() {
        let device = device();
        let kernel = device
            .compile(
                KernelModule::Transpose,
                "matrix_transpose",
                &CompileFlags::new(2, ElementKind::I32),
            )
            .unwrap();
        let input = device.to_device(&[1i32, 2, 3, 4, 5, 6]).unwrap();
        let output = device.allocate::<i32>(6).unwrap();
        let params = TransposeParams { rows: 2, cols: 3 };
        let launch = |work: WorkDescriptor| {
            device.launch(
                &kernel,
                &work,
                &[input.memory(), output.memory()],
                bytemuck::bytes_of(&params),
            )
        };

        // rows and cols swapped
        assert!(matches!(
            launch(WorkDescriptor::tiled(2, 2, 3)),
            Err(ComputeError::Launch { entry_point: "matrix_transpose", .. })
        ));
        launch(WorkDescriptor::tiled(2, 3, 2)).unwrap();
        assert_eq!(device.to_host(&output).unwrap(), vec![1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn rejects_wrong_push_constant_size() {
        let device = device();
        let kernel = device
            .compile(KernelModule::Scan, "prefix_sum", &CompileFlags::new(4, ElementKind::U32))
            .unwrap();
        let input = device.to_device(&[1u32, 2]).unwrap();
        let output = device.allocate::<u32>(2).unwrap();
        let totals = device.allocate::<u32>(1).unwrap();
        let params = ReduceParams { num_elements: 2 };
        let err = device
            .launch(
                &kernel,
                &WorkDescriptor::linear(4, 2),
                &[input.memory(), output.memory(), totals.memory()],
                bytemuck::bytes_of(&params),
            )
            .unwrap_err();
        assert!(matches!(err, ComputeError::Launch { entry_point: "prefix_sum", .. }));
    }

    #[test]
    fn backend_info_names_the_pool() {
        let device = device();
        let info = device.backend_info();
        assert_eq!(info.backend, "cpu");
        assert_eq!(info.to_string(), "cpu (Native) on 2 worker threads");
    }
}
