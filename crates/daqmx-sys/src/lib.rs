//! Low-level FFI bindings for the NI-DAQmx C library.
//!
//! This crate provides raw, unsafe declarations for the subset of the
//! NI-DAQmx C API used by the `daqmx` crate, together with the vendor
//! constants the safe layer needs.
//!
//! # Safety
//!
//! All functions in this crate are `unsafe` as they are direct FFI bindings.
//! For a safe wrapper, use the `daqmx` crate instead.
//!
//! # Features
//!
//! - `daqmx-sdk`: Declare and link the driver entry points. Without this
//!   feature only constants and plain types are available, so dependent
//!   crates compile on machines without the runtime installed.

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(clippy::all)]
#![allow(missing_docs)]

use libc::{c_char, c_void};

pub type int16 = i16;
pub type uInt8 = u8;
pub type uInt16 = u16;
pub type int32 = i32;
pub type uInt32 = u32;
pub type uInt64 = u64;
pub type float64 = f64;
pub type bool32 = u32;

/// Opaque task handle issued by the driver.
pub type TaskHandle = *mut c_void;

/// Absolute time as laid out by the driver: `msb` whole seconds since
/// 1904-01-01 UTC, `lsb` fractional seconds in units of 2^-64 s.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CVIAbsoluteTime {
    pub lsb: uInt64,
    pub msb: i64,
}

pub type DAQmxEveryNSamplesEventCallbackPtr = Option<
    unsafe extern "C" fn(
        taskHandle: TaskHandle,
        everyNsamplesEventType: int32,
        nSamples: uInt32,
        callbackData: *mut c_void,
    ) -> int32,
>;

pub type DAQmxDoneEventCallbackPtr =
    Option<unsafe extern "C" fn(taskHandle: TaskHandle, status: int32, callbackData: *mut c_void) -> int32>;

pub type DAQmxSignalEventCallbackPtr =
    Option<unsafe extern "C" fn(taskHandle: TaskHandle, signalID: int32, callbackData: *mut c_void) -> int32>;

// Fill modes
pub const DAQmx_Val_GroupByChannel: bool32 = 0;
pub const DAQmx_Val_GroupByScanNumber: bool32 = 1;

// Task control actions
pub const DAQmx_Val_Task_Start: int32 = 0;
pub const DAQmx_Val_Task_Stop: int32 = 1;
pub const DAQmx_Val_Task_Verify: int32 = 2;
pub const DAQmx_Val_Task_Commit: int32 = 3;
pub const DAQmx_Val_Task_Reserve: int32 = 4;
pub const DAQmx_Val_Task_Unreserve: int32 = 5;
pub const DAQmx_Val_Task_Abort: int32 = 6;

// Timeouts and sample counts
pub const DAQmx_Val_WaitInfinitely: float64 = -1.0;
pub const DAQmx_Val_Auto: int32 = -1;

// Every N samples event types
pub const DAQmx_Val_Acquired_Into_Buffer: int32 = 1;
pub const DAQmx_Val_Transferred_From_Buffer: int32 = 2;

// Save options
pub const DAQmx_Val_Save_Overwrite: uInt32 = 1 << 0;
pub const DAQmx_Val_Save_AllowInteractiveEditing: uInt32 = 1 << 1;
pub const DAQmx_Val_Save_AllowInteractiveDeletion: uInt32 = 1 << 2;

// Watchdog control actions
pub const DAQmx_Val_ResetTimer: int32 = 0;
pub const DAQmx_Val_ClearExpiration: int32 = 1;

// Event registration options
pub const DAQmx_Val_SynchronousEventCallbacks: uInt32 = 1 << 0;

#[cfg(feature = "daqmx-sdk")]
extern "C" {
    // Task configuration and control
    pub fn DAQmxCreateTask(taskName: *const c_char, taskHandle: *mut TaskHandle) -> int32;
    pub fn DAQmxLoadTask(taskName: *const c_char, taskHandle: *mut TaskHandle) -> int32;
    pub fn DAQmxClearTask(taskHandle: TaskHandle) -> int32;
    pub fn DAQmxStartTask(taskHandle: TaskHandle) -> int32;
    pub fn DAQmxStopTask(taskHandle: TaskHandle) -> int32;
    pub fn DAQmxTaskControl(taskHandle: TaskHandle, action: int32) -> int32;
    pub fn DAQmxWaitUntilTaskDone(taskHandle: TaskHandle, timeToWait: float64) -> int32;
    pub fn DAQmxIsTaskDone(taskHandle: TaskHandle, isTaskDone: *mut bool32) -> int32;
    pub fn DAQmxWaitForValidTimestamp(
        taskHandle: TaskHandle,
        timestampEvent: int32,
        timeout: float64,
        timestamp: *mut CVIAbsoluteTime,
    ) -> int32;
    pub fn DAQmxAddGlobalChansToTask(taskHandle: TaskHandle, channelNames: *const c_char) -> int32;
    pub fn DAQmxSaveTask(
        taskHandle: TaskHandle,
        saveAs: *const c_char,
        author: *const c_char,
        options: uInt32,
    ) -> int32;
    pub fn DAQmxInternalGetLastCreatedChan(value: *mut c_char, size: uInt32) -> int32;

    // Error reporting
    pub fn DAQmxGetExtendedErrorInfo(errorString: *mut c_char, bufferSize: uInt32) -> int32;
    pub fn DAQmxGetErrorString(errorCode: int32, errorString: *mut c_char, bufferSize: uInt32) -> int32;

    // Analog input channels
    pub fn DAQmxCreateAIVoltageChan(
        taskHandle: TaskHandle,
        physicalChannel: *const c_char,
        nameToAssignToChannel: *const c_char,
        terminalConfig: int32,
        minVal: float64,
        maxVal: float64,
        units: int32,
        customScaleName: *const c_char,
    ) -> int32;
    pub fn DAQmxCreateAICurrentChan(
        taskHandle: TaskHandle,
        physicalChannel: *const c_char,
        nameToAssignToChannel: *const c_char,
        terminalConfig: int32,
        minVal: float64,
        maxVal: float64,
        units: int32,
        shuntResistorLoc: int32,
        extShuntResistorVal: float64,
        customScaleName: *const c_char,
    ) -> int32;
    pub fn DAQmxCreateAIThrmcplChan(
        taskHandle: TaskHandle,
        physicalChannel: *const c_char,
        nameToAssignToChannel: *const c_char,
        minVal: float64,
        maxVal: float64,
        units: int32,
        thermocoupleType: int32,
        cjcSource: int32,
        cjcVal: float64,
        cjcChannel: *const c_char,
    ) -> int32;
    pub fn DAQmxCreateAIPowerChan(
        taskHandle: TaskHandle,
        physicalChannel: *const c_char,
        nameToAssignToChannel: *const c_char,
        voltageSetpoint: float64,
        currentSetpoint: float64,
        outputEnable: bool32,
    ) -> int32;

    // Analog output channels
    pub fn DAQmxCreateAOVoltageChan(
        taskHandle: TaskHandle,
        physicalChannel: *const c_char,
        nameToAssignToChannel: *const c_char,
        minVal: float64,
        maxVal: float64,
        units: int32,
        customScaleName: *const c_char,
    ) -> int32;
    pub fn DAQmxCreateAOCurrentChan(
        taskHandle: TaskHandle,
        physicalChannel: *const c_char,
        nameToAssignToChannel: *const c_char,
        minVal: float64,
        maxVal: float64,
        units: int32,
        customScaleName: *const c_char,
    ) -> int32;

    // Digital channels
    pub fn DAQmxCreateDIChan(
        taskHandle: TaskHandle,
        lines: *const c_char,
        nameToAssignToLines: *const c_char,
        lineGrouping: int32,
    ) -> int32;
    pub fn DAQmxCreateDOChan(
        taskHandle: TaskHandle,
        lines: *const c_char,
        nameToAssignToLines: *const c_char,
        lineGrouping: int32,
    ) -> int32;

    // Counter input channels
    pub fn DAQmxCreateCICountEdgesChan(
        taskHandle: TaskHandle,
        counter: *const c_char,
        nameToAssignToChannel: *const c_char,
        edge: int32,
        initialCount: uInt32,
        countDirection: int32,
    ) -> int32;
    pub fn DAQmxCreateCIFreqChan(
        taskHandle: TaskHandle,
        counter: *const c_char,
        nameToAssignToChannel: *const c_char,
        minVal: float64,
        maxVal: float64,
        units: int32,
        edge: int32,
        measMethod: int32,
        measTime: float64,
        divisor: uInt32,
        customScaleName: *const c_char,
    ) -> int32;
    pub fn DAQmxCreateCIPeriodChan(
        taskHandle: TaskHandle,
        counter: *const c_char,
        nameToAssignToChannel: *const c_char,
        minVal: float64,
        maxVal: float64,
        units: int32,
        edge: int32,
        measMethod: int32,
        measTime: float64,
        divisor: uInt32,
        customScaleName: *const c_char,
    ) -> int32;
    pub fn DAQmxCreateCIPulseWidthChan(
        taskHandle: TaskHandle,
        counter: *const c_char,
        nameToAssignToChannel: *const c_char,
        minVal: float64,
        maxVal: float64,
        units: int32,
        startingEdge: int32,
        customScaleName: *const c_char,
    ) -> int32;
    pub fn DAQmxCreateCISemiPeriodChan(
        taskHandle: TaskHandle,
        counter: *const c_char,
        nameToAssignToChannel: *const c_char,
        minVal: float64,
        maxVal: float64,
        units: int32,
        customScaleName: *const c_char,
    ) -> int32;
    pub fn DAQmxCreateCITwoEdgeSepChan(
        taskHandle: TaskHandle,
        counter: *const c_char,
        nameToAssignToChannel: *const c_char,
        minVal: float64,
        maxVal: float64,
        units: int32,
        firstEdge: int32,
        secondEdge: int32,
        customScaleName: *const c_char,
    ) -> int32;
    pub fn DAQmxCreateCIPulseChanFreq(
        taskHandle: TaskHandle,
        counter: *const c_char,
        nameToAssignToChannel: *const c_char,
        minVal: float64,
        maxVal: float64,
        units: int32,
    ) -> int32;
    pub fn DAQmxCreateCIPulseChanTime(
        taskHandle: TaskHandle,
        counter: *const c_char,
        nameToAssignToChannel: *const c_char,
        minVal: float64,
        maxVal: float64,
        units: int32,
    ) -> int32;
    pub fn DAQmxCreateCIPulseChanTicks(
        taskHandle: TaskHandle,
        counter: *const c_char,
        nameToAssignToChannel: *const c_char,
        sourceTerminal: *const c_char,
        minVal: float64,
        maxVal: float64,
    ) -> int32;

    // Counter output channels
    pub fn DAQmxCreateCOPulseChanFreq(
        taskHandle: TaskHandle,
        counter: *const c_char,
        nameToAssignToChannel: *const c_char,
        units: int32,
        idleState: int32,
        initialDelay: float64,
        freq: float64,
        dutyCycle: float64,
    ) -> int32;
    pub fn DAQmxCreateCOPulseChanTime(
        taskHandle: TaskHandle,
        counter: *const c_char,
        nameToAssignToChannel: *const c_char,
        units: int32,
        idleState: int32,
        initialDelay: float64,
        lowTime: float64,
        highTime: float64,
    ) -> int32;
    pub fn DAQmxCreateCOPulseChanTicks(
        taskHandle: TaskHandle,
        counter: *const c_char,
        nameToAssignToChannel: *const c_char,
        sourceTerminal: *const c_char,
        idleState: int32,
        initialDelay: int32,
        lowTicks: int32,
        highTicks: int32,
    ) -> int32;

    // Timing
    pub fn DAQmxCfgSampClkTiming(
        taskHandle: TaskHandle,
        source: *const c_char,
        rate: float64,
        activeEdge: int32,
        sampleMode: int32,
        sampsPerChan: uInt64,
    ) -> int32;
    pub fn DAQmxCfgImplicitTiming(taskHandle: TaskHandle, sampleMode: int32, sampsPerChan: uInt64) -> int32;
    pub fn DAQmxCfgHandshakingTiming(taskHandle: TaskHandle, sampleMode: int32, sampsPerChan: uInt64) -> int32;
    pub fn DAQmxCfgBurstHandshakingTimingImportClock(
        taskHandle: TaskHandle,
        sampleMode: int32,
        sampsPerChan: uInt64,
        sampleClkRate: float64,
        sampleClkSrc: *const c_char,
        sampleClkActiveEdge: int32,
        pauseWhen: int32,
        readyEventActiveLevel: int32,
    ) -> int32;
    pub fn DAQmxCfgBurstHandshakingTimingExportClock(
        taskHandle: TaskHandle,
        sampleMode: int32,
        sampsPerChan: uInt64,
        sampleClkRate: float64,
        sampleClkOutpTerm: *const c_char,
        sampleClkPulsePolarity: int32,
        pauseWhen: int32,
        readyEventActiveLevel: int32,
    ) -> int32;
    pub fn DAQmxCfgChangeDetectionTiming(
        taskHandle: TaskHandle,
        risingEdgeChan: *const c_char,
        fallingEdgeChan: *const c_char,
        sampleMode: int32,
        sampsPerChan: uInt64,
    ) -> int32;
    pub fn DAQmxCfgPipelinedSampClkTiming(
        taskHandle: TaskHandle,
        source: *const c_char,
        rate: float64,
        activeEdge: int32,
        sampleMode: int32,
        sampsPerChan: uInt64,
    ) -> int32;

    // Triggering
    pub fn DAQmxCfgDigEdgeStartTrig(taskHandle: TaskHandle, triggerSource: *const c_char, triggerEdge: int32) -> int32;
    pub fn DAQmxCfgAnlgEdgeStartTrig(
        taskHandle: TaskHandle,
        triggerSource: *const c_char,
        triggerSlope: int32,
        triggerLevel: float64,
    ) -> int32;
    pub fn DAQmxCfgTimeStartTrig(taskHandle: TaskHandle, when: CVIAbsoluteTime, timescale: int32) -> int32;
    pub fn DAQmxDisableStartTrig(taskHandle: TaskHandle) -> int32;
    pub fn DAQmxCfgDigEdgeRefTrig(
        taskHandle: TaskHandle,
        triggerSource: *const c_char,
        triggerEdge: int32,
        pretriggerSamples: uInt32,
    ) -> int32;
    pub fn DAQmxCfgAnlgEdgeRefTrig(
        taskHandle: TaskHandle,
        triggerSource: *const c_char,
        triggerSlope: int32,
        triggerLevel: float64,
        pretriggerSamples: uInt32,
    ) -> int32;
    pub fn DAQmxDisableRefTrig(taskHandle: TaskHandle) -> int32;
    pub fn DAQmxSendSoftwareTrigger(taskHandle: TaskHandle, triggerID: int32) -> int32;

    // Export signals and logging
    pub fn DAQmxExportSignal(taskHandle: TaskHandle, signalID: int32, outputTerminal: *const c_char) -> int32;
    pub fn DAQmxConfigureLogging(
        taskHandle: TaskHandle,
        filePath: *const c_char,
        loggingMode: int32,
        groupName: *const c_char,
        operation: int32,
    ) -> int32;
    pub fn DAQmxStartNewFile(taskHandle: TaskHandle, filePath: *const c_char) -> int32;

    // Read
    pub fn DAQmxReadAnalogF64(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        timeout: float64,
        fillMode: bool32,
        readArray: *mut float64,
        arraySizeInSamps: uInt32,
        sampsPerChanRead: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxReadAnalogScalarF64(
        taskHandle: TaskHandle,
        timeout: float64,
        value: *mut float64,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxReadBinaryI16(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        timeout: float64,
        fillMode: bool32,
        readArray: *mut int16,
        arraySizeInSamps: uInt32,
        sampsPerChanRead: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxReadBinaryU16(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        timeout: float64,
        fillMode: bool32,
        readArray: *mut uInt16,
        arraySizeInSamps: uInt32,
        sampsPerChanRead: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxReadBinaryI32(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        timeout: float64,
        fillMode: bool32,
        readArray: *mut int32,
        arraySizeInSamps: uInt32,
        sampsPerChanRead: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxReadBinaryU32(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        timeout: float64,
        fillMode: bool32,
        readArray: *mut uInt32,
        arraySizeInSamps: uInt32,
        sampsPerChanRead: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxReadDigitalLines(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        timeout: float64,
        fillMode: bool32,
        readArray: *mut uInt8,
        arraySizeInBytes: uInt32,
        sampsPerChanRead: *mut int32,
        numBytesPerSamp: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxReadDigitalU8(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        timeout: float64,
        fillMode: bool32,
        readArray: *mut uInt8,
        arraySizeInSamps: uInt32,
        sampsPerChanRead: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxReadDigitalU16(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        timeout: float64,
        fillMode: bool32,
        readArray: *mut uInt16,
        arraySizeInSamps: uInt32,
        sampsPerChanRead: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxReadDigitalU32(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        timeout: float64,
        fillMode: bool32,
        readArray: *mut uInt32,
        arraySizeInSamps: uInt32,
        sampsPerChanRead: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxReadDigitalScalarU32(
        taskHandle: TaskHandle,
        timeout: float64,
        value: *mut uInt32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxReadCounterF64Ex(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        timeout: float64,
        fillMode: bool32,
        readArray: *mut float64,
        arraySizeInSamps: uInt32,
        sampsPerChanRead: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxReadCounterU32Ex(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        timeout: float64,
        fillMode: bool32,
        readArray: *mut uInt32,
        arraySizeInSamps: uInt32,
        sampsPerChanRead: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxReadCounterScalarF64(
        taskHandle: TaskHandle,
        timeout: float64,
        value: *mut float64,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxReadCounterScalarU32(
        taskHandle: TaskHandle,
        timeout: float64,
        value: *mut uInt32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxReadCtrFreq(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        timeout: float64,
        interleaved: bool32,
        readArrayFrequency: *mut float64,
        readArrayDutyCycle: *mut float64,
        arraySizeInSamps: uInt32,
        sampsPerChanRead: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxReadCtrTime(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        timeout: float64,
        interleaved: bool32,
        readArrayHighTime: *mut float64,
        readArrayLowTime: *mut float64,
        arraySizeInSamps: uInt32,
        sampsPerChanRead: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxReadCtrTicks(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        timeout: float64,
        interleaved: bool32,
        readArrayHighTicks: *mut uInt32,
        readArrayLowTicks: *mut uInt32,
        arraySizeInSamps: uInt32,
        sampsPerChanRead: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxReadCtrFreqScalar(
        taskHandle: TaskHandle,
        timeout: float64,
        frequency: *mut float64,
        dutyCycle: *mut float64,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxReadCtrTimeScalar(
        taskHandle: TaskHandle,
        timeout: float64,
        highTime: *mut float64,
        lowTime: *mut float64,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxReadCtrTicksScalar(
        taskHandle: TaskHandle,
        timeout: float64,
        highTicks: *mut uInt32,
        lowTicks: *mut uInt32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxReadPowerF64(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        timeout: float64,
        fillMode: int32,
        readArrayVoltage: *mut float64,
        readArrayCurrent: *mut float64,
        arraySizeInSamps: uInt32,
        sampsPerChanRead: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxReadPowerBinaryI16(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        timeout: float64,
        fillMode: int32,
        readArrayVoltage: *mut int16,
        readArrayCurrent: *mut int16,
        arraySizeInSamps: uInt32,
        sampsPerChanRead: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxReadPowerScalarF64(
        taskHandle: TaskHandle,
        timeout: float64,
        voltage: *mut float64,
        current: *mut float64,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxReadRaw(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        timeout: float64,
        readArray: *mut c_void,
        arraySizeInBytes: uInt32,
        sampsRead: *mut int32,
        numBytesPerSamp: *mut int32,
        reserved: *mut bool32,
    ) -> int32;

    // Write
    pub fn DAQmxWriteAnalogF64(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        autoStart: bool32,
        timeout: float64,
        dataLayout: bool32,
        writeArray: *const float64,
        sampsPerChanWritten: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxWriteAnalogScalarF64(
        taskHandle: TaskHandle,
        autoStart: bool32,
        timeout: float64,
        value: float64,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxWriteBinaryI16(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        autoStart: bool32,
        timeout: float64,
        dataLayout: bool32,
        writeArray: *const int16,
        sampsPerChanWritten: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxWriteBinaryU16(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        autoStart: bool32,
        timeout: float64,
        dataLayout: bool32,
        writeArray: *const uInt16,
        sampsPerChanWritten: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxWriteBinaryI32(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        autoStart: bool32,
        timeout: float64,
        dataLayout: bool32,
        writeArray: *const int32,
        sampsPerChanWritten: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxWriteBinaryU32(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        autoStart: bool32,
        timeout: float64,
        dataLayout: bool32,
        writeArray: *const uInt32,
        sampsPerChanWritten: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxWriteDigitalLines(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        autoStart: bool32,
        timeout: float64,
        dataLayout: bool32,
        writeArray: *const uInt8,
        sampsPerChanWritten: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxWriteDigitalU8(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        autoStart: bool32,
        timeout: float64,
        dataLayout: bool32,
        writeArray: *const uInt8,
        sampsPerChanWritten: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxWriteDigitalU16(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        autoStart: bool32,
        timeout: float64,
        dataLayout: bool32,
        writeArray: *const uInt16,
        sampsPerChanWritten: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxWriteDigitalU32(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        autoStart: bool32,
        timeout: float64,
        dataLayout: bool32,
        writeArray: *const uInt32,
        sampsPerChanWritten: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxWriteDigitalScalarU32(
        taskHandle: TaskHandle,
        autoStart: bool32,
        timeout: float64,
        value: uInt32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxWriteCtrFreq(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        autoStart: bool32,
        timeout: float64,
        dataLayout: bool32,
        frequency: *const float64,
        dutyCycle: *const float64,
        numSampsPerChanWritten: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxWriteCtrFreqScalar(
        taskHandle: TaskHandle,
        autoStart: bool32,
        timeout: float64,
        frequency: float64,
        dutyCycle: float64,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxWriteCtrTime(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        autoStart: bool32,
        timeout: float64,
        dataLayout: bool32,
        highTime: *const float64,
        lowTime: *const float64,
        numSampsPerChanWritten: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxWriteCtrTimeScalar(
        taskHandle: TaskHandle,
        autoStart: bool32,
        timeout: float64,
        highTime: float64,
        lowTime: float64,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxWriteCtrTicks(
        taskHandle: TaskHandle,
        numSampsPerChan: int32,
        autoStart: bool32,
        timeout: float64,
        dataLayout: bool32,
        highTicks: *const uInt32,
        lowTicks: *const uInt32,
        numSampsPerChanWritten: *mut int32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxWriteCtrTicksScalar(
        taskHandle: TaskHandle,
        autoStart: bool32,
        timeout: float64,
        highTicks: uInt32,
        lowTicks: uInt32,
        reserved: *mut bool32,
    ) -> int32;
    pub fn DAQmxWriteRaw(
        taskHandle: TaskHandle,
        numSamps: int32,
        autoStart: bool32,
        timeout: float64,
        writeArray: *const c_void,
        sampsPerChanWritten: *mut int32,
        reserved: *mut bool32,
    ) -> int32;

    // Events
    pub fn DAQmxRegisterEveryNSamplesEvent(
        task: TaskHandle,
        everyNsamplesEventType: int32,
        nSamples: uInt32,
        options: uInt32,
        callbackFunction: DAQmxEveryNSamplesEventCallbackPtr,
        callbackData: *mut c_void,
    ) -> int32;
    pub fn DAQmxRegisterDoneEvent(
        task: TaskHandle,
        options: uInt32,
        callbackFunction: DAQmxDoneEventCallbackPtr,
        callbackData: *mut c_void,
    ) -> int32;
    pub fn DAQmxRegisterSignalEvent(
        task: TaskHandle,
        signalID: int32,
        options: uInt32,
        callbackFunction: DAQmxSignalEventCallbackPtr,
        callbackData: *mut c_void,
    ) -> int32;

    // Watchdog
    pub fn DAQmxCreateWatchdogTimerTaskEx(
        deviceName: *const c_char,
        sessionName: *const c_char,
        taskHandle: *mut TaskHandle,
        timeout: float64,
    ) -> int32;
    pub fn DAQmxControlWatchdogTask(taskHandle: TaskHandle, action: int32) -> int32;
    pub fn DAQmxCfgWatchdogAOExpirStates(
        taskHandle: TaskHandle,
        channelNames: *const c_char,
        expirStateArray: *const float64,
        outputTypeArray: *const int32,
        arraySize: uInt32,
    ) -> int32;
    pub fn DAQmxCfgWatchdogCOExpirStates(
        taskHandle: TaskHandle,
        channelNames: *const c_char,
        expirStateArray: *const int32,
        arraySize: uInt32,
    ) -> int32;
    pub fn DAQmxCfgWatchdogDOExpirStates(
        taskHandle: TaskHandle,
        channelNames: *const c_char,
        expirStateArray: *const int32,
        arraySize: uInt32,
    ) -> int32;

    // Attributes. The value argument is variadic: a pointer (plus a buffer
    // size for strings and arrays) for getters, the value itself for setters.
    pub fn DAQmxGetTaskAttribute(taskHandle: TaskHandle, attribute: int32, value: *mut c_void, ...) -> int32;

    pub fn DAQmxGetChanAttribute(
        taskHandle: TaskHandle,
        channel: *const c_char,
        attribute: int32,
        value: *mut c_void,
        ...
    ) -> int32;
    pub fn DAQmxSetChanAttribute(taskHandle: TaskHandle, channel: *const c_char, attribute: int32, ...) -> int32;
    pub fn DAQmxResetChanAttribute(taskHandle: TaskHandle, channel: *const c_char, attribute: int32) -> int32;

    pub fn DAQmxGetTimingAttribute(taskHandle: TaskHandle, attribute: int32, value: *mut c_void, ...) -> int32;
    pub fn DAQmxSetTimingAttribute(taskHandle: TaskHandle, attribute: int32, ...) -> int32;
    pub fn DAQmxResetTimingAttribute(taskHandle: TaskHandle, attribute: int32) -> int32;

    pub fn DAQmxGetTrigAttribute(taskHandle: TaskHandle, attribute: int32, value: *mut c_void, ...) -> int32;
    pub fn DAQmxSetTrigAttribute(taskHandle: TaskHandle, attribute: int32, ...) -> int32;
    pub fn DAQmxResetTrigAttribute(taskHandle: TaskHandle, attribute: int32) -> int32;

    pub fn DAQmxGetReadAttribute(taskHandle: TaskHandle, attribute: int32, value: *mut c_void, ...) -> int32;
    pub fn DAQmxSetReadAttribute(taskHandle: TaskHandle, attribute: int32, ...) -> int32;
    pub fn DAQmxResetReadAttribute(taskHandle: TaskHandle, attribute: int32) -> int32;

    pub fn DAQmxGetWriteAttribute(taskHandle: TaskHandle, attribute: int32, value: *mut c_void, ...) -> int32;
    pub fn DAQmxSetWriteAttribute(taskHandle: TaskHandle, attribute: int32, ...) -> int32;
    pub fn DAQmxResetWriteAttribute(taskHandle: TaskHandle, attribute: int32) -> int32;

    pub fn DAQmxGetExportedSignalAttribute(taskHandle: TaskHandle, attribute: int32, value: *mut c_void, ...) -> int32;
    pub fn DAQmxSetExportedSignalAttribute(taskHandle: TaskHandle, attribute: int32, ...) -> int32;
    pub fn DAQmxResetExportedSignalAttribute(taskHandle: TaskHandle, attribute: int32) -> int32;

    pub fn DAQmxGetBufferAttribute(taskHandle: TaskHandle, attribute: int32, value: *mut c_void, ...) -> int32;
    pub fn DAQmxSetBufferAttribute(taskHandle: TaskHandle, attribute: int32, ...) -> int32;
    pub fn DAQmxResetBufferAttribute(taskHandle: TaskHandle, attribute: int32) -> int32;

    pub fn DAQmxGetWatchdogAttribute(
        taskHandle: TaskHandle,
        lines: *const c_char,
        attribute: int32,
        value: *mut c_void,
        ...
    ) -> int32;
    pub fn DAQmxSetWatchdogAttribute(taskHandle: TaskHandle, lines: *const c_char, attribute: int32, ...) -> int32;
    pub fn DAQmxResetWatchdogAttribute(taskHandle: TaskHandle, lines: *const c_char, attribute: int32) -> int32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_mode_constants() {
        assert_eq!(DAQmx_Val_GroupByChannel, 0);
        assert_eq!(DAQmx_Val_GroupByScanNumber, 1);
    }

    #[test]
    fn test_save_option_bits() {
        let options = DAQmx_Val_Save_Overwrite | DAQmx_Val_Save_AllowInteractiveDeletion;
        assert_eq!(options, 0b101);
    }

    #[test]
    fn test_absolute_time_layout() {
        assert_eq!(std::mem::size_of::<CVIAbsoluteTime>(), 16);
    }
}
